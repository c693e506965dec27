//! Resolution of a completed contract tree into per-party payouts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  commission::percent_of,
  contract::{Contract, SubContract},
};

/// What one party is owed from a completed contract tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
  pub payout_id:        Uuid,
  /// The root contract whose completion produced this payout.
  pub root_contract_id: Uuid,
  pub party_user_id:    Uuid,
  /// Contracts in the tree on which this party was the hired user.
  pub contract_ids:     Vec<Uuid>,
  pub gross:            i64,
  /// Total split off to this party's subcontractors.
  pub deductions:       i64,
  pub platform_fee:     i64,
  /// Never negative.
  pub net:              i64,
  pub recorded_at:      DateTime<Utc>,
}

/// Result of the complete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
  pub contract:     Contract,
  pub payouts:      Vec<Payout>,
  /// Net earning of the root contract's hired party on the root contract.
  pub main_earning: i64,
}

/// The platform's cut of a contract: the captured fixed amount, or the
/// captured percentage of the contract amount.
pub fn platform_fee(contract: &Contract) -> i64 {
  contract
    .platform_commission_amount
    .unwrap_or_else(|| percent_of(contract.amount, contract.platform_commission_percent))
}

/// `amount - deductions - fee`, clamped at zero.
pub fn net_earning(amount: i64, deductions: i64, fee: i64) -> i64 {
  amount.saturating_sub(deductions).saturating_sub(fee).max(0)
}

/// Payouts for every distinct party in the tree rooted at `root`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
  pub payouts:      Vec<Payout>,
  pub main_earning: i64,
}

/// Settle `root` and its descendants.
///
/// `edges` are the subcontract rows below `root`; `contracts` must contain
/// every child contract they name. Edges naming an unknown child are skipped.
/// Fails with [`Error::Validation`] when a sum leaves the `i64` range.
pub fn settle(
  root: &Contract,
  contracts: &HashMap<Uuid, Contract>,
  edges: &[SubContract],
) -> Result<Settlement> {
  let mut deductions: HashMap<Uuid, i64> = HashMap::new();
  for edge in edges {
    let total = deductions.entry(edge.parent_contract_id).or_default();
    *total = add(*total, edge.split_amount)?;
  }

  let mut order = vec![root];
  order.extend(edges.iter().filter_map(|e| contracts.get(&e.sub_contract_id)));

  let now = Utc::now();
  let mut payouts: Vec<Payout> = Vec::new();
  let mut main_earning = 0;

  for contract in order {
    let deducted = deductions.get(&contract.contract_id).copied().unwrap_or(0);
    let fee = platform_fee(contract);
    let net = net_earning(contract.amount, deducted, fee);
    if contract.contract_id == root.contract_id {
      main_earning = net;
    }

    match payouts.iter_mut().find(|p| p.party_user_id == contract.hired_user_id) {
      Some(p) => {
        p.contract_ids.push(contract.contract_id);
        p.gross = add(p.gross, contract.amount)?;
        p.deductions = add(p.deductions, deducted)?;
        p.platform_fee = add(p.platform_fee, fee)?;
        p.net = add(p.net, net)?;
      }
      None => payouts.push(Payout {
        payout_id: Uuid::new_v4(),
        root_contract_id: root.contract_id,
        party_user_id: contract.hired_user_id,
        contract_ids: vec![contract.contract_id],
        gross: contract.amount,
        deductions: deducted,
        platform_fee: fee,
        net,
        recorded_at: now,
      }),
    }
  }

  Ok(Settlement { payouts, main_earning })
}

fn add(a: i64, b: i64) -> Result<i64> {
  a.checked_add(b).ok_or_else(|| {
    Error::Validation("contract amounts in this tree exceed the supported range".into())
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    commission::CommissionType,
    contract::ContractStatus,
    job::BillingCycle,
  };

  fn contract(amount: i64, percent: f64, parent: Option<Uuid>) -> Contract {
    Contract {
      contract_id: Uuid::new_v4(),
      job_id: Uuid::new_v4(),
      application_id: Uuid::new_v4(),
      hired_by_user_id: Uuid::new_v4(),
      hired_user_id: Uuid::new_v4(),
      amount,
      status: ContractStatus::Active,
      billing_cycle: BillingCycle::Weekly,
      parent_contract_id: parent,
      commission_type: CommissionType::Percentage,
      platform_commission_percent: percent,
      platform_commission_amount: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
      completed_at: None,
    }
  }

  fn link(root: &Contract, parent: &Contract, child: &Contract) -> SubContract {
    SubContract::link(root.contract_id, parent, child, &Default::default())
  }

  #[test]
  fn root_with_one_subcontract() {
    let root = contract(1000, 5.0, None);
    let child = contract(400, 0.0, Some(root.contract_id));
    let edges = vec![link(&root, &root, &child)];
    let contracts = HashMap::from([(child.contract_id, child.clone())]);

    let s = settle(&root, &contracts, &edges).unwrap();
    assert_eq!(s.main_earning, 550);
    assert_eq!(s.payouts.len(), 2);
    assert_eq!(s.payouts[0].party_user_id, root.hired_user_id);
    assert_eq!(s.payouts[0].deductions, 400);
    assert_eq!(s.payouts[0].platform_fee, 50);
    assert_eq!(s.payouts[1].party_user_id, child.hired_user_id);
    assert_eq!(s.payouts[1].net, 400);
  }

  #[test]
  fn fixed_fee_takes_precedence_over_percent() {
    let mut root = contract(1000, 5.0, None);
    root.platform_commission_amount = Some(120);
    assert_eq!(platform_fee(&root), 120);
    let s = settle(&root, &HashMap::new(), &[]).unwrap();
    assert_eq!(s.main_earning, 880);
  }

  #[test]
  fn net_is_clamped_at_zero() {
    let root = contract(300, 10.0, None);
    let child = contract(500, 0.0, Some(root.contract_id));
    let edges = vec![link(&root, &root, &child)];
    let contracts = HashMap::from([(child.contract_id, child)]);

    let s = settle(&root, &contracts, &edges).unwrap();
    assert_eq!(s.main_earning, 0);
    assert!(s.payouts.iter().all(|p| p.net >= 0));
    assert_eq!(net_earning(10, 20, 5), 0);
    assert_eq!(net_earning(i64::MIN, 1, 1), 0);
  }

  #[test]
  fn deductions_apply_per_level() {
    let root = contract(1000, 0.0, None);
    let mid = contract(600, 10.0, Some(root.contract_id));
    let leaf = contract(200, 0.0, Some(mid.contract_id));
    let edges = vec![link(&root, &root, &mid), link(&root, &mid, &leaf)];
    let contracts = HashMap::from([
      (mid.contract_id, mid.clone()),
      (leaf.contract_id, leaf.clone()),
    ]);

    let s = settle(&root, &contracts, &edges).unwrap();
    let by_party: HashMap<_, _> =
      s.payouts.iter().map(|p| (p.party_user_id, p.net)).collect();
    assert_eq!(by_party[&root.hired_user_id], 400);
    assert_eq!(by_party[&mid.hired_user_id], 600 - 200 - 60);
    assert_eq!(by_party[&leaf.hired_user_id], 200);
  }

  #[test]
  fn repeated_party_gets_one_payout() {
    let root = contract(1000, 0.0, None);
    let mut child = contract(300, 0.0, Some(root.contract_id));
    child.hired_user_id = root.hired_user_id;
    let edges = vec![link(&root, &root, &child)];
    let contracts = HashMap::from([(child.contract_id, child.clone())]);

    let s = settle(&root, &contracts, &edges).unwrap();
    assert_eq!(s.payouts.len(), 1);
    assert_eq!(s.payouts[0].contract_ids, vec![root.contract_id, child.contract_id]);
    assert_eq!(s.payouts[0].net, 700 + 300);
    assert_eq!(s.main_earning, 700);
  }

  #[test]
  fn overflowing_split_total_is_rejected() {
    let root = contract(1000, 0.0, None);
    let a = contract(i64::MAX, 0.0, Some(root.contract_id));
    let b = contract(i64::MAX, 0.0, Some(root.contract_id));
    let edges = vec![link(&root, &root, &a), link(&root, &root, &b)];
    let contracts =
      HashMap::from([(a.contract_id, a.clone()), (b.contract_id, b.clone())]);

    let err = settle(&root, &contracts, &edges).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
  }
}
