//! Read-side rollups for the admin dashboard.
//!
//! The store computes the raw groupings; the report types here are what the
//! services assemble from them.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  application::{Funnel, Stage},
  job::JobStatus,
  user::Role,
};

/// How many skills and companies the job report lists.
pub const TOP_N: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
  /// Active accounts only.
  pub total:   u64,
  pub by_role: BTreeMap<Role, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillDemand {
  pub skill: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyJobCount {
  pub company_id:   Uuid,
  pub company_name: Option<String>,
  pub job_count:    u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStats {
  pub total:          u64,
  /// Postings with status `open`.
  pub active:         u64,
  pub by_status:      BTreeMap<JobStatus, u64>,
  pub applications:   u64,
  /// Offers as a rounded percentage of all applications.
  pub placement_rate: u64,
  pub funnel:         Funnel,
  /// Most requested skills across open postings.
  pub skills_demand:  Vec<SkillDemand>,
  /// Companies with the most postings.
  pub company_stats:  Vec<CompanyJobCount>,
}

/// Restricts a funnel to a slice of the applications.
#[derive(Debug, Clone, Default)]
pub struct FunnelFilter {
  /// Student graduation year.
  pub batch:      Option<i32>,
  /// Student department.
  pub department: Option<String>,
  pub job_id:     Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentFunnel {
  pub department: Option<String>,
  pub stages:     Funnel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementAnalytics {
  pub placement_funnel: Funnel,
  pub department_stats: Vec<DepartmentFunnel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyFunnel {
  pub company_id:         Uuid,
  pub company_name:       Option<String>,
  pub stages:             Funnel,
  pub total_applications: u64,
}

/// A raw `(group, stage, count)` row as produced by the store.
pub type GroupedStageCount<K> = (K, Stage, u64);

/// Offers as a whole-number percentage of `applications`, rounded half up.
pub fn placement_rate(offered: u64, applications: u64) -> u64 {
  if applications == 0 {
    return 0;
  }
  (offered * 200 + applications) / (applications * 2)
}

/// Fold `(group, stage, count)` rows into one funnel per group, keeping the
/// first-seen group order.
pub fn fold_grouped<K: PartialEq>(
  rows: Vec<GroupedStageCount<K>>,
) -> Vec<(K, Funnel)> {
  let mut out: Vec<(K, Funnel)> = Vec::new();
  for (key, stage, count) in rows {
    match out.iter_mut().find(|(k, _)| *k == key) {
      Some((_, funnel)) => {
        *funnel.entry(stage).or_default() += count;
      }
      None => {
        let mut funnel = Funnel::new();
        funnel.insert(stage, count);
        out.push((key, funnel));
      }
    }
  }
  out
}
