//! Platform commission policy.
//!
//! The rate table is read-only from the engine's point of view. It is looked
//! up per operation through [`CommissionResolver`]; nothing is cached.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Result, job::BillingCycle};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissionType {
  #[default]
  Percentage,
  FixedAmount,
}

/// A user's role as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
  pub role_id:   String,
  pub role_name: String,
}

/// Commission configuration for one (role, billing cycle) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCommission {
  pub role_id:         String,
  pub billing_cycle:   BillingCycle,
  pub commission_type: CommissionType,
  #[serde(default)]
  pub percent:         f64,
  #[serde(default)]
  pub fixed_amount:    i64,
}

/// The commission actually charged on a given contract amount.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Charge {
  pub commission_type: CommissionType,
  pub percent:         f64,
  pub amount:          i64,
}

impl Charge {
  /// Charge `rate` against `amount`. No configured rate means no commission.
  pub fn compute(rate: Option<&RoleCommission>, amount: i64) -> Self {
    match rate {
      None => Self::default(),
      Some(r) => match r.commission_type {
        CommissionType::FixedAmount => Self {
          commission_type: CommissionType::FixedAmount,
          percent:         0.0,
          amount:          r.fixed_amount,
        },
        CommissionType::Percentage => Self {
          commission_type: CommissionType::Percentage,
          percent:         r.percent,
          amount:          percent_of(amount, r.percent),
        },
      },
    }
  }
}

/// `percent`% of `amount`, rounded half away from zero to a whole minor unit.
pub fn percent_of(amount: i64, percent: f64) -> i64 {
  (amount as f64 * percent / 100.0).round() as i64
}

// ─── Collaborator traits ─────────────────────────────────────────────────────

/// Identity lookup: which role does a user hold?
pub trait RoleDirectory: Send + Sync {
  fn user_role(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<UserRole>>> + Send + '_;
}

/// Commission rate table lookup.
pub trait CommissionPolicy: Send + Sync {
  fn commission<'a>(
    &'a self,
    role_id: &'a str,
    billing_cycle: BillingCycle,
  ) -> impl Future<Output = Result<Option<RoleCommission>>> + Send + 'a;
}

/// Resolves the commission rate that applies to a hired user.
#[derive(Debug, Clone)]
pub struct CommissionResolver<P> {
  policy: P,
}

impl<P> CommissionResolver<P>
where
  P: RoleDirectory + CommissionPolicy,
{
  pub fn new(policy: P) -> Self { Self { policy } }

  /// Look up the rate for `user_id`'s role and `billing_cycle`.
  ///
  /// Users without a role, and roles without a configured rate, resolve to
  /// `None`, which charges no commission.
  pub async fn resolve(
    &self,
    user_id: Uuid,
    billing_cycle: BillingCycle,
  ) -> Result<Option<RoleCommission>> {
    let Some(role) = self.policy.user_role(user_id).await? else {
      tracing::debug!(%user_id, "no role on record; no commission applies");
      return Ok(None);
    };
    self.policy.commission(&role.role_id, billing_cycle).await
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[derive(Default)]
  struct Table {
    roles: HashMap<Uuid, UserRole>,
    rates: Vec<RoleCommission>,
  }

  impl RoleDirectory for Table {
    async fn user_role(&self, user_id: Uuid) -> Result<Option<UserRole>> {
      Ok(self.roles.get(&user_id).cloned())
    }
  }

  impl CommissionPolicy for Table {
    async fn commission(
      &self,
      role_id: &str,
      billing_cycle: BillingCycle,
    ) -> Result<Option<RoleCommission>> {
      Ok(
        self
          .rates
          .iter()
          .find(|r| r.role_id == role_id && r.billing_cycle == billing_cycle)
          .cloned(),
      )
    }
  }

  fn rate(commission_type: CommissionType, percent: f64, fixed: i64) -> RoleCommission {
    RoleCommission {
      role_id: "carrier".into(),
      billing_cycle: BillingCycle::Weekly,
      commission_type,
      percent,
      fixed_amount: fixed,
    }
  }

  #[test]
  fn percentage_charge_scales_with_amount() {
    let r = rate(CommissionType::Percentage, 5.0, 0);
    let c = Charge::compute(Some(&r), 1000);
    assert_eq!(c.amount, 50);
    assert_eq!(c.percent, 5.0);
  }

  #[test]
  fn fixed_charge_ignores_amount() {
    let r = rate(CommissionType::FixedAmount, 12.0, 75);
    let c = Charge::compute(Some(&r), 1_000_000);
    assert_eq!(c.commission_type, CommissionType::FixedAmount);
    assert_eq!(c.amount, 75);
  }

  #[test]
  fn missing_rate_charges_nothing() {
    assert_eq!(Charge::compute(None, 1000), Charge::default());
  }

  #[test]
  fn percent_rounds_to_nearest_unit() {
    assert_eq!(percent_of(999, 2.5), 25);
    assert_eq!(percent_of(1, 50.0), 1);
    assert_eq!(percent_of(0, 12.0), 0);
  }

  #[tokio::test]
  async fn resolver_chains_role_and_rate() {
    let user = Uuid::new_v4();
    let mut table = Table::default();
    table.roles.insert(user, UserRole {
      role_id:   "carrier".into(),
      role_name: "Carrier".into(),
    });
    table.rates.push(rate(CommissionType::Percentage, 7.5, 0));
    let resolver = CommissionResolver::new(table);

    let found = resolver.resolve(user, BillingCycle::Weekly).await.unwrap();
    assert_eq!(found.map(|r| r.percent), Some(7.5));

    let other_cycle = resolver.resolve(user, BillingCycle::Hourly).await.unwrap();
    assert!(other_cycle.is_none());

    let stranger = resolver.resolve(Uuid::new_v4(), BillingCycle::Weekly).await.unwrap();
    assert!(stranger.is_none());
  }
}
