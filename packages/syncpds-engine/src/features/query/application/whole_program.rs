/*
 * Whole-Program Analysis
 *
 * Batch mode over many seed queries. Each query gets its own engine, so
 * solvers never cross threads; with `share_call_graph` the engines still
 * pool discovered call edges through the context.
 *
 * With the `parallel` feature, queries run on a rayon pool sized by
 * `parallel_workers` (0 = rayon default). Output order always matches
 * input order.
 */

use super::context::AnalysisContext;
use crate::errors::Result;
use crate::features::query::domain::{BackwardQuery, BackwardResults, ForwardQuery, ForwardResults};
use crate::features::weights::{Reachability, Weight, WeightFunctions};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[cfg(feature = "parallel")]
use crate::errors::SyncPdsError;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub struct WholeProgramAnalysis {
    context: AnalysisContext,
}

impl WholeProgramAnalysis {
    pub fn new(context: AnalysisContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    fn backward_one(&self, query: &BackwardQuery) -> Result<BackwardResults> {
        self.context
            .engine::<Reachability>()
            .solve_backward(query.clone())
    }

    fn forward_one<W: Weight>(
        &self,
        query: &ForwardQuery,
        weights: &Arc<dyn WeightFunctions<W>>,
    ) -> Result<ForwardResults<W>> {
        self.context
            .engine::<W>()
            .with_weight_functions(weights.clone())
            .solve_forward(query.clone())
    }

    /// Solve every backward query
    pub fn run_backward(
        &self,
        queries: &[BackwardQuery],
    ) -> Result<Vec<(BackwardQuery, Result<BackwardResults>)>> {
        let start = Instant::now();
        let results = self.map_queries(queries, |query| self.backward_one(query))?;
        info!(
            queries = queries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            call_edges = self.context.call_graph().edge_count(),
            "whole-program backward run finished"
        );
        Ok(results)
    }

    /// Solve every forward query under `weights`
    pub fn run_forward<W: Weight>(
        &self,
        queries: &[ForwardQuery],
        weights: Arc<dyn WeightFunctions<W>>,
    ) -> Result<Vec<(ForwardQuery, Result<ForwardResults<W>>)>> {
        let start = Instant::now();
        let results = self.map_queries(queries, |query| self.forward_one(query, &weights))?;
        info!(
            queries = queries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            call_edges = self.context.call_graph().edge_count(),
            "whole-program forward run finished"
        );
        Ok(results)
    }

    #[cfg(feature = "parallel")]
    fn map_queries<Q, R, F>(&self, queries: &[Q], run: F) -> Result<Vec<(Q, R)>>
    where
        Q: Clone + Send + Sync,
        R: Send,
        F: Fn(&Q) -> R + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.context.config().parallel_workers)
            .thread_name(|i| format!("syncpds-worker-{}", i))
            .build()
            .map_err(|e| SyncPdsError::internal(format!("Failed to build thread pool: {}", e)))?;

        Ok(pool.install(|| {
            queries
                .par_iter()
                .map(|query| (query.clone(), run(query)))
                .collect()
        }))
    }

    #[cfg(not(feature = "parallel"))]
    fn map_queries<Q, R, F>(&self, queries: &[Q], run: F) -> Result<Vec<(Q, R)>>
    where
        Q: Clone,
        F: Fn(&Q) -> R,
    {
        Ok(queries
            .iter()
            .map(|query| (query.clone(), run(query)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::query::application::AnalysisScope;
    use crate::features::query::infrastructure::{InMemoryProgram, MethodBuilder};
    use crate::features::weights::OneWeightFunctions;
    use crate::shared::models::{Method, Statement, Val};
    use crate::SyncPdsError;

    fn analysis(workers: usize) -> (WholeProgramAnalysis, Method) {
        let main = Method::new("Main", "main");
        let mut b = MethodBuilder::new(main.clone());
        b.alloc("a", "A");
        b.alloc("c", "C");
        b.copy("d", "a");
        b.ret(None);
        let mut program = InMemoryProgram::new();
        program.add_method(b);

        let config = AnalysisConfig::default().parallel_workers(workers);
        let context = AnalysisContext::new(Arc::new(program), config).unwrap();
        (WholeProgramAnalysis::new(context), main)
    }

    #[test]
    fn test_backward_results_keep_input_order() {
        let (analysis, main) = analysis(2);
        let queries = vec![
            BackwardQuery::new(Statement::new(main.clone(), 3), Val::local("d", &main)),
            BackwardQuery::new(Statement::new(main.clone(), 3), Val::local("c", &main)),
            BackwardQuery::new(Statement::new(main.clone(), 42), Val::local("c", &main)),
        ];

        let results = analysis.run_backward(&queries).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, queries[0]);

        let first = results[0].1.as_ref().unwrap();
        assert_eq!(
            first.allocation_statements(),
            [Statement::new(main.clone(), 1)].into_iter().collect()
        );
        let second = results[1].1.as_ref().unwrap();
        assert_eq!(
            second.allocation_statements(),
            [Statement::new(main.clone(), 2)].into_iter().collect()
        );
        assert!(matches!(results[2].1, Err(SyncPdsError::MalformedQuery { .. })));
    }

    #[test]
    fn test_forward_over_every_allocation() {
        let (analysis, main) = analysis(0);
        let program = analysis.context().program().clone();
        let queries = AnalysisScope::new(program.as_ref()).allocation_sites();
        let weights: Arc<dyn WeightFunctions<Reachability>> = Arc::new(OneWeightFunctions);

        let results = analysis.run_forward(&queries, weights).unwrap();
        assert_eq!(results.len(), 2);

        let from_a = results[0].1.as_ref().unwrap();
        assert!(from_a
            .reached
            .contains(&crate::shared::models::Node::new(
                Statement::new(main.clone(), 3),
                Val::local("d", &main)
            )));
        let from_c = results[1].1.as_ref().unwrap();
        assert!(from_c.reached_at(&Statement::new(main.clone(), 3)).all(|n| n.fact == Val::local("c", &main)));
    }
}
