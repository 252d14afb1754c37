/*
 * In-Memory Program Model
 *
 * A ProgramModel assembled by hand, for tests, benchmarks and embedders
 * that already have their own IR. Statement 0 of every method is its
 * Entry; each builder call appends one statement linked to the previous
 * one unless `no_fallthrough` was requested.
 *
 * Virtual dispatch walks a single-inheritance class table. Methods without
 * a body, and methods explicitly excluded, are out of scope.
 */

use crate::shared::models::{
    ControlFlowEdge, Field, InvokeExpr, Method, Rvalue, Statement, StatementKind, Val,
};
use crate::shared::ports::ProgramModel;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct MethodBody {
    params: Vec<Val>,
    this: Option<Val>,
    statements: Vec<StatementKind>,
    edges: Vec<ControlFlowEdge>,
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
    parent: Option<String>,
    methods: BTreeSet<String>,
}

/// Builds one method body statement by statement
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    method: Method,
    body: MethodBody,
    fallthrough: bool,
}

impl MethodBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: MethodBody {
                params: Vec::new(),
                this: None,
                statements: vec![StatementKind::Entry],
                edges: Vec::new(),
            },
            fallthrough: true,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Local of this method
    pub fn local(&self, name: &str) -> Val {
        Val::local(name, &self.method)
    }

    pub fn params(&mut self, names: &[&str]) -> &mut Self {
        self.body.params = names.iter().map(|n| self.local(n)).collect();
        self
    }

    /// Declare an instance method with receiver local `this`
    pub fn with_this(&mut self) -> &mut Self {
        self.body.this = Some(self.local("this"));
        self
    }

    pub fn entry(&self) -> Statement {
        Statement::new(self.method.clone(), 0)
    }

    /// Next statement is not linked from the previous one
    pub fn no_fallthrough(&mut self) -> &mut Self {
        self.fallthrough = false;
        self
    }

    pub fn add_edge(&mut self, from: &Statement, to: &Statement) -> &mut Self {
        self.body
            .edges
            .push(ControlFlowEdge::new(from.clone(), to.clone()));
        self
    }

    pub fn push(&mut self, kind: StatementKind) -> Statement {
        let index = self.body.statements.len();
        let stmt = Statement::new(self.method.clone(), index);
        if self.fallthrough {
            self.body.edges.push(ControlFlowEdge::new(
                Statement::new(self.method.clone(), index - 1),
                stmt.clone(),
            ));
        }
        self.fallthrough = !kind.is_return();
        self.body.statements.push(kind);
        stmt
    }

    /// `lhs = new T()`
    pub fn alloc(&mut self, lhs: &str, type_name: &str) -> Statement {
        let lhs = self.local(lhs);
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::New {
                type_name: type_name.to_string(),
            },
        })
    }

    /// `lhs = rhs`
    pub fn copy(&mut self, lhs: &str, rhs: &str) -> Statement {
        let (lhs, rhs) = (self.local(lhs), self.local(rhs));
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::Local(rhs),
        })
    }

    pub fn assign_null(&mut self, lhs: &str) -> Statement {
        let lhs = self.local(lhs);
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::Null,
        })
    }

    /// `lhs = base.field`
    pub fn load(&mut self, lhs: &str, base: &str, field: &str) -> Statement {
        let (lhs, base) = (self.local(lhs), self.local(base));
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::Load {
                base,
                field: Field::named(field),
            },
        })
    }

    /// `base.field = rhs`
    pub fn store(&mut self, base: &str, field: &str, rhs: &str) -> Statement {
        let (base, rhs) = (self.local(base), self.local(rhs));
        self.push(StatementKind::Store {
            base,
            field: Field::named(field),
            rhs,
        })
    }

    /// `lhs = base[i]`
    pub fn array_load(&mut self, lhs: &str, base: &str) -> Statement {
        let (lhs, base) = (self.local(lhs), self.local(base));
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::Load {
                base,
                field: Field::array(),
            },
        })
    }

    /// `base[i] = rhs`
    pub fn array_store(&mut self, base: &str, rhs: &str) -> Statement {
        let (base, rhs) = (self.local(base), self.local(rhs));
        self.push(StatementKind::Store {
            base,
            field: Field::array(),
            rhs,
        })
    }

    /// `Static.name = local`
    pub fn store_static(&mut self, name: &str, rhs: &str) -> Statement {
        let rhs = self.local(rhs);
        self.push(StatementKind::Assign {
            lhs: Val::static_field(name),
            rhs: Rvalue::Local(rhs),
        })
    }

    /// `local = Static.name`
    pub fn load_static(&mut self, lhs: &str, name: &str) -> Statement {
        let lhs = self.local(lhs);
        self.push(StatementKind::Assign {
            lhs,
            rhs: Rvalue::Local(Val::static_field(name)),
        })
    }

    /// Statically bound call `lhs = target(args)`
    pub fn call(&mut self, lhs: Option<&str>, target: &Method, args: &[&str]) -> Statement {
        let call = InvokeExpr {
            method_name: target.name.clone(),
            receiver: None,
            args: args.iter().map(|a| self.local(a)).collect(),
            static_target: Some(target.clone()),
        };
        let lhs = lhs.map(|l| self.local(l));
        self.push(StatementKind::Invoke { lhs, call })
    }

    /// Instance call with a known target (constructors, private methods)
    pub fn call_special(
        &mut self,
        lhs: Option<&str>,
        receiver: &str,
        target: &Method,
        args: &[&str],
    ) -> Statement {
        let call = InvokeExpr {
            method_name: target.name.clone(),
            receiver: Some(self.local(receiver)),
            args: args.iter().map(|a| self.local(a)).collect(),
            static_target: Some(target.clone()),
        };
        let lhs = lhs.map(|l| self.local(l));
        self.push(StatementKind::Invoke { lhs, call })
    }

    /// Dynamically dispatched call `lhs = receiver.name(args)`
    pub fn call_virtual(
        &mut self,
        lhs: Option<&str>,
        receiver: &str,
        method_name: &str,
        args: &[&str],
    ) -> Statement {
        let call = InvokeExpr {
            method_name: method_name.to_string(),
            receiver: Some(self.local(receiver)),
            args: args.iter().map(|a| self.local(a)).collect(),
            static_target: None,
        };
        let lhs = lhs.map(|l| self.local(l));
        self.push(StatementKind::Invoke { lhs, call })
    }

    pub fn nop(&mut self) -> Statement {
        self.push(StatementKind::Nop)
    }

    pub fn ret(&mut self, value: Option<&str>) -> Statement {
        let value = value.map(|v| self.local(v));
        self.push(StatementKind::Return { value })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProgram {
    bodies: BTreeMap<Method, MethodBody>,
    classes: BTreeMap<String, ClassInfo>,
    excluded: BTreeSet<Method>,
}

impl InMemoryProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a finished method body; the method's class declares it
    pub fn add_method(&mut self, builder: MethodBuilder) -> Method {
        let MethodBuilder { method, body, .. } = builder;
        self.classes
            .entry(method.declaring_class.clone())
            .or_default()
            .methods
            .insert(method.name.clone());
        self.bodies.insert(method.clone(), body);
        method
    }

    /// Declare `class` with an optional superclass
    pub fn declare_class(&mut self, class: &str, parent: Option<&str>) -> &mut Self {
        let info = self.classes.entry(class.to_string()).or_default();
        info.parent = parent.map(str::to_string);
        self
    }

    /// Keep `method` opaque even when it has a body
    pub fn exclude(&mut self, method: &Method) -> &mut Self {
        self.excluded.insert(method.clone());
        self
    }

    pub fn method_count(&self) -> usize {
        self.bodies.len()
    }
}

impl ProgramModel for InMemoryProgram {
    fn methods(&self) -> Vec<Method> {
        self.bodies.keys().cloned().collect()
    }

    fn statements(&self, method: &Method) -> Vec<Statement> {
        self.bodies
            .get(method)
            .map(|body| {
                (0..body.statements.len())
                    .map(|i| Statement::new(method.clone(), i))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn statement(&self, stmt: &Statement) -> Option<&StatementKind> {
        self.bodies.get(&stmt.method)?.statements.get(stmt.index)
    }

    fn edges(&self, method: &Method) -> Vec<ControlFlowEdge> {
        self.bodies
            .get(method)
            .map(|body| body.edges.clone())
            .unwrap_or_default()
    }

    fn parameters(&self, method: &Method) -> Vec<Val> {
        self.bodies
            .get(method)
            .map(|body| body.params.clone())
            .unwrap_or_default()
    }

    fn this_local(&self, method: &Method) -> Option<Val> {
        self.bodies.get(method)?.this.clone()
    }

    fn call_targets(&self, stmt: &Statement) -> Vec<Method> {
        self.invoke_expr(stmt)
            .and_then(|call| call.static_target.clone())
            .into_iter()
            .collect()
    }

    fn resolve_virtual(&self, type_name: &str, method_name: &str) -> Option<Method> {
        let mut class = Some(type_name.to_string());
        let mut seen = BTreeSet::new();
        while let Some(name) = class {
            if !seen.insert(name.clone()) {
                return None;
            }
            let info = self.classes.get(&name)?;
            if info.methods.contains(method_name) {
                return Some(Method::new(name, method_name));
            }
            class = info.parent.clone();
        }
        None
    }

    fn in_scope(&self, method: &Method) -> bool {
        self.bodies.contains_key(method) && !self.excluded.contains(method)
    }
}
