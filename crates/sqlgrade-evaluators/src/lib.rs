use std::sync::Arc;

use sqlgrade_core::evaluator::Evaluator;
use sqlgrade_core::model::QuestionKind;
use sqlgrade_core::render::RenderOptions;

mod classify;
mod ddl;
mod dql;
mod keyword;
mod plan;

pub use classify::{classify, table_under_test, Failure, UNKNOWN_TABLE};
pub use ddl::{DdlEvaluator, HIDDEN_ERROR};
pub use dql::{DqlEvaluator, PLAN_FAILED, TABLES_MISSING, TABLES_PRESENT};
pub use plan::scanned_tables;

pub fn evaluator_for(kind: QuestionKind, render: RenderOptions) -> Arc<dyn Evaluator> {
    match kind {
        QuestionKind::Ddl => Arc::new(DdlEvaluator::new(render)),
        QuestionKind::Dql => Arc::new(DqlEvaluator::new(render)),
    }
}
