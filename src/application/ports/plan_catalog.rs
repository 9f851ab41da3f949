use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::entities::plan::{Plan, ProductLookup},
};

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Resolve a provider product id to a plan.
    async fn get_product(&self, lookup: &ProductLookup) -> AppResult<Option<Plan>>;
    async fn get_plan(&self, plan_id: &str) -> AppResult<Option<Plan>>;
    async fn list_plans(&self) -> AppResult<Vec<Plan>>;
}
