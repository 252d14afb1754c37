use std::sync::Arc;
use syncpds_engine::config::AnalysisConfig;
use syncpds_engine::features::query::{InMemoryProgram, MethodBuilder};
use syncpds_engine::{AnalysisContext, Method, ProgramModel, Statement, Val};

pub fn main_method() -> Method {
    Method::new("Main", "main")
}

pub fn stmt(method: &Method, index: usize) -> Statement {
    Statement::new(method.clone(), index)
}

pub fn local(method: &Method, name: &str) -> Val {
    Val::local(name, method)
}

pub fn shared(program: InMemoryProgram) -> Arc<dyn ProgramModel> {
    Arc::new(program)
}

pub fn context(program: InMemoryProgram, config: AnalysisConfig) -> AnalysisContext {
    AnalysisContext::new(shared(program), config).expect("valid config")
}

/// ```text
/// 1: a = new A
/// 2: b = a
/// 3: ret
/// ```
pub fn copy_program() -> InMemoryProgram {
    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.copy("b", "a");
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}

/// ```text
/// Main.id(p) { 1: ret p }
///
/// 1: a = new A
/// 2: b = id(a)
/// 3: nop
/// 4: ret
/// ```
pub fn identity_call_program() -> InMemoryProgram {
    let id = Method::new("Main", "id");
    let mut callee = MethodBuilder::new(id.clone());
    callee.params(&["p"]);
    callee.ret(Some("p"));

    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.call(Some("b"), &id, &["a"]);
    b.nop();
    b.ret(None);

    let mut program = InMemoryProgram::new();
    program.add_method(callee);
    program.add_method(b);
    program
}

/// ```text
/// Util.set(p, v) { 1: p.f = v  2: ret }
///
/// 1: a = new A
/// 2: o = new O
/// 3: set(o, a)
/// 4: x = o.f
/// 5: ret
/// ```
pub fn field_across_call_program() -> InMemoryProgram {
    let set = Method::new("Util", "set");
    let mut callee = MethodBuilder::new(set.clone());
    callee.params(&["p", "v"]);
    callee.store("p", "f", "v");
    callee.ret(None);

    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.alloc("o", "O");
    b.call(None, &set, &["o", "a"]);
    b.load("x", "o", "f");
    b.ret(None);

    let mut program = InMemoryProgram::new();
    program.add_method(callee);
    program.add_method(b);
    program
}

/// Store and load through two names of the same object
///
/// ```text
/// 1: a = new A
/// 2: o = new O
/// 3: q = o
/// 4: q.f = a
/// 5: x = o.f
/// 6: ret
/// ```
pub fn field_alias_program() -> InMemoryProgram {
    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.alloc("o", "O");
    b.copy("q", "o");
    b.store("q", "f", "a");
    b.load("x", "o", "f");
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}

/// ```text
/// 1: x = new X
/// 2: x.f = x
/// 3: y = x.f
/// 4: ret
/// ```
pub fn self_referential_program() -> InMemoryProgram {
    let mut b = MethodBuilder::new(main_method());
    b.alloc("x", "X");
    b.store("x", "f", "x");
    b.load("y", "x", "f");
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}

/// Virtual call resolved only through the receiver's allocation
///
/// ```text
/// Box.id(this, p) { 1: ret p }
///
/// 1: a = new A
/// 2: bx = new Box
/// 3: b = bx.id(a)
/// 4: nop
/// 5: ret
/// ```
pub fn virtual_call_program() -> InMemoryProgram {
    let id = Method::new("Box", "id");
    let mut callee = MethodBuilder::new(id);
    callee.with_this();
    callee.params(&["p"]);
    callee.ret(Some("p"));

    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.alloc("bx", "Box");
    b.call_virtual(Some("b"), "bx", "id", &["a"]);
    b.nop();
    b.ret(None);

    let mut program = InMemoryProgram::new();
    program.declare_class("Box", None);
    program.add_method(callee);
    program.add_method(b);
    program
}

/// ```text
/// 1: a = new A
/// 2: System.exit()
/// 3: b = a
/// 4: ret
/// ```
pub fn exit_program() -> InMemoryProgram {
    let exit = Method::new("System", "exit");
    let mut b = MethodBuilder::new(main_method());
    b.alloc("a", "A");
    b.call(None, &exit, &[]);
    b.copy("b", "a");
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}

/// Straight-line resource usage: allocation, then `actions` on `r`
pub fn resource_program(type_name: &str, actions: &[&str]) -> InMemoryProgram {
    let mut b = MethodBuilder::new(main_method());
    b.alloc("r", type_name);
    for action in actions {
        b.call_virtual(None, "r", action, &[]);
    }
    b.ret(None);
    let mut program = InMemoryProgram::new();
    program.add_method(b);
    program
}
