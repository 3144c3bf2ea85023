//! Admin dashboards.

use std::collections::BTreeMap;

use super::Portal;
use crate::{
  Error, Result,
  application::Stage,
  job::JobStatus,
  stats::{
    CompanyFunnel, DepartmentFunnel, FunnelFilter, JobStats, PlacementAnalytics,
    TOP_N, UserStats, fold_grouped, placement_rate,
  },
  store::PortalStore,
  user::{Actor, Role},
};

impl<S: PortalStore> Portal<S> {
  pub async fn user_stats(&self, actor: &Actor) -> Result<UserStats> {
    actor.require(Role::Admin)?;
    let by_role: BTreeMap<Role, u64> = self
      .store
      .count_active_users_by_role()
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();
    Ok(UserStats {
      total: by_role.values().sum(),
      by_role,
    })
  }

  pub async fn job_stats(&self, actor: &Actor) -> Result<JobStats> {
    actor.require(Role::Admin)?;
    let by_status: BTreeMap<JobStatus, u64> = self
      .store
      .count_jobs_by_status()
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();
    let funnel = self
      .store
      .funnel(&FunnelFilter::default())
      .await
      .map_err(Error::store)?;
    let skills_demand =
      self.store.skill_demand(TOP_N).await.map_err(Error::store)?;
    let company_stats = self
      .store
      .top_companies_by_jobs(TOP_N)
      .await
      .map_err(Error::store)?;

    let applications: u64 = funnel.values().sum();
    let offered = funnel.get(&Stage::Offered).copied().unwrap_or(0);

    Ok(JobStats {
      total: by_status.values().sum(),
      active: by_status.get(&JobStatus::Open).copied().unwrap_or(0),
      by_status,
      applications,
      placement_rate: placement_rate(offered, applications),
      funnel,
      skills_demand,
      company_stats,
    })
  }

  /// Funnel for a batch and/or department, plus per-department funnels.
  pub async fn placement_analytics(
    &self,
    actor: &Actor,
    batch: Option<i32>,
    department: Option<String>,
  ) -> Result<PlacementAnalytics> {
    actor.require(Role::Admin)?;
    let filter = FunnelFilter {
      batch,
      department,
      job_id: None,
    };
    let placement_funnel =
      self.store.funnel(&filter).await.map_err(Error::store)?;
    let rows = self.store.department_funnels().await.map_err(Error::store)?;

    Ok(PlacementAnalytics {
      placement_funnel,
      department_stats: fold_grouped(rows)
        .into_iter()
        .map(|(department, stages)| DepartmentFunnel { department, stages })
        .collect(),
    })
  }

  /// Per-company application totals by stage, busiest companies first.
  pub async fn company_analytics(
    &self,
    actor: &Actor,
  ) -> Result<Vec<CompanyFunnel>> {
    actor.require(Role::Admin)?;
    let rows = self.store.company_funnels().await.map_err(Error::store)?;
    let mut companies: Vec<CompanyFunnel> = fold_grouped(rows)
      .into_iter()
      .map(|((company_id, company_name), stages)| CompanyFunnel {
        company_id,
        company_name,
        total_applications: stages.values().sum(),
        stages,
      })
      .collect();
    companies.sort_by(|a, b| b.total_applications.cmp(&a.total_applications));
    Ok(companies)
  }
}
