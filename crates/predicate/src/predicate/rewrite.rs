//! Rewrite passes over compiled predicates.
//!
//! The reference builder emits one equality alternative per value. When two
//! or more alternatives share their type and locality and pin no version,
//! [`collapse_reference_sets`] turns them into a single set-membership test on
//! the target id. The result matches exactly the same rows.

use std::collections::BTreeSet;

use super::ast::{CompareOp, Field, Operand, Predicate, RowCondition, RowMatch};
use crate::types::IndexTable;

/// Applies the reference-set rewrite to every reference row match in the tree.
pub fn collapse_reference_sets(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(members) => {
            Predicate::and(members.into_iter().map(collapse_reference_sets))
        }
        Predicate::Or(members) => Predicate::or(members.into_iter().map(collapse_reference_sets)),
        Predicate::Not(inner) => Predicate::not(collapse_reference_sets(*inner)),
        Predicate::Exists(RowMatch {
            table: IndexTable::Reference,
            param_id,
            condition: RowCondition::Or(alternatives),
        }) => Predicate::exists(
            IndexTable::Reference,
            param_id,
            RowCondition::or(collapse_alternatives(alternatives)),
        ),
        other => other,
    }
}

/// Groups collapsible alternatives by their shared shape.
///
/// Groups keep the position of their first member; alternatives that cannot
/// be collapsed, and groups of one, are left untouched.
pub fn collapse_alternatives(alternatives: Vec<RowCondition>) -> Vec<RowCondition> {
    enum Slot {
        Kept(RowCondition),
        Group(Vec<RowCondition>, Vec<(Operand, RowCondition)>),
    }

    let mut slots: Vec<Slot> = Vec::new();

    for alt in alternatives {
        let Some((shape, id)) = split_id_equality(&alt) else {
            slots.push(Slot::Kept(alt));
            continue;
        };
        let existing = slots.iter_mut().find_map(|s| match s {
            Slot::Group(key, members) if *key == shape => Some(members),
            _ => None,
        });
        match existing {
            Some(members) => members.push((id, alt)),
            None => slots.push(Slot::Group(shape, vec![(id, alt)])),
        }
    }

    let mut out = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Kept(alt) => out.push(alt),
            Slot::Group(_, mut members) if members.len() == 1 => {
                if let Some((_, alt)) = members.pop() {
                    out.push(alt);
                }
            }
            Slot::Group(shape, members) => {
                let ids: BTreeSet<Operand> = members.into_iter().map(|(id, _)| id).collect();
                out.push(RowCondition::and(
                    shape
                        .into_iter()
                        .chain(std::iter::once(RowCondition::one_of(Field::ReferenceId, ids))),
                ));
            }
        }
    }
    out
}

/// Splits `shape AND target_id = X` into (shape, X).
///
/// Only conjunctions that fix the target type and do not constrain the
/// version qualify.
fn split_id_equality(condition: &RowCondition) -> Option<(Vec<RowCondition>, Operand)> {
    let RowCondition::And(parts) = condition else {
        return None;
    };

    let mut id = None;
    let mut has_type = false;
    let mut shape = Vec::with_capacity(parts.len());

    for part in parts {
        match part {
            RowCondition::Compare {
                field: Field::ReferenceId,
                op: CompareOp::Eq,
                value,
            } => {
                if id.replace(value.clone()).is_some() {
                    return None;
                }
            }
            RowCondition::Compare {
                field: Field::ReferenceVersion,
                ..
            }
            | RowCondition::IsNull(Field::ReferenceVersion)
            | RowCondition::In {
                field: Field::ReferenceVersion,
                ..
            } => return None,
            RowCondition::Compare {
                field: Field::ReferenceType,
                op: CompareOp::Eq,
                ..
            } => {
                has_type = true;
                shape.push(part.clone());
            }
            other => shape.push(other.clone()),
        }
    }

    if !has_type {
        return None;
    }
    id.map(|id| (shape, id))
}
