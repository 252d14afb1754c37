use super::engine::QueryEngine;
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::query::infrastructure::OnTheFlyCallGraph;
use crate::features::weights::Weight;
use crate::shared::ports::ProgramModel;
use std::sync::Arc;
use tracing::debug;

/// Program, configuration and call graph shared by the engines of one
/// analysis run
///
/// Cheap to clone. With `share_call_graph` every engine handed out resolves
/// against the same on-the-fly call graph; otherwise each engine starts
/// from the static call targets alone.
#[derive(Clone)]
pub struct AnalysisContext {
    program: Arc<dyn ProgramModel>,
    call_graph: Arc<OnTheFlyCallGraph>,
    config: AnalysisConfig,
}

impl AnalysisContext {
    pub fn new(program: Arc<dyn ProgramModel>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        debug!(preset = %config.preset.as_str(), "analysis context created");
        Ok(Self {
            program,
            call_graph: Arc::new(OnTheFlyCallGraph::new()),
            config,
        })
    }

    pub fn program(&self) -> &Arc<dyn ProgramModel> {
        &self.program
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn call_graph(&self) -> &Arc<OnTheFlyCallGraph> {
        &self.call_graph
    }

    /// Fresh engine over this context
    pub fn engine<W: Weight>(&self) -> QueryEngine<W> {
        let engine = QueryEngine::new(self.program.clone(), self.config.clone());
        if self.config.share_call_graph {
            engine.with_call_graph(self.call_graph.clone())
        } else {
            engine
        }
    }

    /// Forget every discovered call-graph edge
    pub fn reset(&mut self) {
        self.call_graph = Arc::new(OnTheFlyCallGraph::new());
    }
}

impl std::fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("config", &self.config)
            .field("call_graph", &self.call_graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::query::infrastructure::InMemoryProgram;
    use crate::features::weights::Reachability;
    use crate::shared::models::Statement;

    fn context(share: bool) -> AnalysisContext {
        let config = AnalysisConfig::default().share_call_graph(share);
        AnalysisContext::new(Arc::new(InMemoryProgram::new()), config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig::default().max_sub_queries(0);
        assert!(AnalysisContext::new(Arc::new(InMemoryProgram::new()), config).is_err());
    }

    #[test]
    fn test_engines_share_call_graph() {
        let ctx = context(true);
        let engine: QueryEngine<Reachability> = ctx.engine();
        assert!(Arc::ptr_eq(engine.call_graph(), ctx.call_graph()));
    }

    #[test]
    fn test_private_call_graph_when_not_shared() {
        let ctx = context(false);
        let engine: QueryEngine<Reachability> = ctx.engine();
        assert!(!Arc::ptr_eq(engine.call_graph(), ctx.call_graph()));
    }

    #[test]
    fn test_reset_drops_edges() {
        let mut ctx = context(true);
        let cs = Statement::new(crate::shared::models::Method::new("A", "main"), 1);
        ctx.call_graph()
            .add_edge(&cs, &crate::shared::models::Method::new("B", "run"));
        assert_eq!(ctx.call_graph().edge_count(), 1);

        ctx.reset();
        assert_eq!(ctx.call_graph().edge_count(), 0);
    }
}
