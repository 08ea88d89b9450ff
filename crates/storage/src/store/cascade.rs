#![forbid(unsafe_code)]

//! Status propagation across the parent and dependency graphs.
//!
//! Both graphs are user data and may contain cycles; every walk keeps a
//! visited set and considers each id at most once.

use super::items::{
    LOG_TYPE_PROGRESS, add_log_tx, apply_status_tx, child_ids, dependency_ids, dependent_ids,
    live_item, require_live_item,
};
use super::{CascadeReport, NewAction, SqliteStore, StoreError, UnblockReport, WriteTx};
use rusqlite::Connection;
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use wt_core::EntitySnapshot;
use wt_core::model::{ActionKind, EntityType, Status};

impl SqliteStore {
    /// Moves ancestors of `item_id` to `target` while every child of each
    /// epic ancestor has reached it. Only `InReview` and `Closed` propagate.
    pub fn cascade_up_parent_status(
        &mut self,
        item_id: &str,
        target: Status,
        session_id: &str,
    ) -> Result<CascadeReport, StoreError> {
        self.write(|tx| cascade_up_tx(tx, session_id, item_id, target))
    }

    /// Reopens blocked dependents of `closed_id` whose dependencies are now all
    /// closed. Single hop.
    pub fn cascade_unblock_dependents(
        &mut self,
        closed_id: &str,
        session_id: &str,
    ) -> Result<UnblockReport, StoreError> {
        self.write(|tx| unblock_dependents_tx(tx, session_id, closed_id))
    }

    pub fn descendants(&self, root_id: &str) -> Result<Vec<String>, StoreError> {
        descendants_in(&self.conn, root_id)
    }
}

pub(super) fn cascade_up_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    item_id: &str,
    target: Status,
) -> Result<CascadeReport, StoreError> {
    let mut report = CascadeReport::default();
    if !matches!(target, Status::InReview | Status::Closed) {
        return Ok(report);
    }

    let mut visited = HashSet::from([item_id.to_string()]);
    let mut current = require_live_item(tx, item_id)?;
    while let Some(parent_id) = current.parent_id.clone() {
        if !visited.insert(parent_id.clone()) {
            break;
        }
        let Some(parent) = live_item(tx, &parent_id)? else {
            break;
        };
        if !parent.item_type.is_container() || parent.status.has_reached(target) {
            break;
        }
        if !children_reached(tx, &parent.id, target)? {
            break;
        }

        let updated = apply_status_tx(tx, &parent, target)?;
        add_log_tx(
            tx,
            session_id,
            &parent.id,
            &format!(
                "Auto-cascaded to {}: all children reached {}",
                target.as_str(),
                target.as_str()
            ),
            LOG_TYPE_PROGRESS,
        )?;
        let kind = match target {
            Status::Closed => ActionKind::Close,
            _ => ActionKind::Review,
        };
        tx.record_action(
            NewAction::new(session_id, kind, EntityType::Item, &parent.id)
                .previous(EntitySnapshot::of(&parent)?)
                .new_state(EntitySnapshot::of(&updated)?),
        )?;
        debug!(parent = %parent.id, to = target.as_str(), "epic cascaded");

        report.ids.push(parent.id.clone());
        if target == Status::Closed {
            report
                .unblocked
                .extend(unblock_dependents_tx(tx, session_id, &parent.id)?.ids);
        }
        current = updated;
    }
    Ok(report)
}

fn children_reached(conn: &Connection, parent_id: &str, target: Status) -> Result<bool, StoreError> {
    let children = child_ids(conn, parent_id)?;
    if children.is_empty() {
        return Ok(false);
    }
    for child_id in children {
        match live_item(conn, &child_id)? {
            Some(child) if child.status.has_reached(target) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

pub(super) fn unblock_dependents_tx(
    tx: &WriteTx<'_>,
    session_id: &str,
    closed_id: &str,
) -> Result<UnblockReport, StoreError> {
    let mut report = UnblockReport::default();
    for dependent_id in dependent_ids(tx, closed_id)? {
        let Some(dependent) = live_item(tx, &dependent_id)? else {
            continue;
        };
        if dependent.status != Status::Blocked || !dependencies_closed(tx, &dependent.id)? {
            continue;
        }

        let reopened = apply_status_tx(tx, &dependent, Status::Open)?;
        add_log_tx(
            tx,
            session_id,
            &dependent.id,
            &format!("Auto-unblocked: all dependencies closed (last: {closed_id})"),
            LOG_TYPE_PROGRESS,
        )?;
        tx.record_action(
            NewAction::new(session_id, ActionKind::Unblock, EntityType::Item, &dependent.id)
                .previous(EntitySnapshot::of(&dependent)?)
                .new_state(EntitySnapshot::of(&reopened)?),
        )?;
        debug!(id = %dependent.id, closed = closed_id, "dependent unblocked");
        report.ids.push(dependent.id);
    }
    Ok(report)
}

/// A dependency that is missing or soft-deleted counts as not closed.
fn dependencies_closed(conn: &Connection, item_id: &str) -> Result<bool, StoreError> {
    for dependency_id in dependency_ids(conn, item_id)? {
        match live_item(conn, &dependency_id)? {
            Some(dependency) if dependency.status == Status::Closed => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Level-order walk of the parent -> children edge. The root is excluded and
/// each id is reported once, in the order it was first reached.
pub(super) fn descendants_in(conn: &Connection, root_id: &str) -> Result<Vec<String>, StoreError> {
    require_live_item(conn, root_id)?;
    let mut visited = HashSet::from([root_id.to_string()]);
    let mut queue = VecDeque::from([root_id.to_string()]);
    let mut out = Vec::new();
    while let Some(id) = queue.pop_front() {
        for child_id in child_ids(conn, &id)? {
            if visited.insert(child_id.clone()) {
                out.push(child_id.clone());
                queue.push_back(child_id);
            }
        }
    }
    Ok(out)
}
