//! Proptest generators for property-based testing.
//!
//! Ids are drawn from small ranges so that generated operations collide on
//! the same grant keys often enough to be interesting.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use liteboard_core::{
    Action, ContentId, ContentIdSet, ContentType, GrantKey, NewGrant, PermissionLevel, UserId,
};

/// Generate a user id in `1..=8`.
pub fn user_id() -> impl Strategy<Value = UserId> {
    (1i64..=8).prop_map(UserId)
}

/// Generate a content id in `1..=16`.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    (1i64..=16).prop_map(ContentId)
}

/// Generate an action tier.
pub fn action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Read), Just(Action::Write), Just(Action::Admin)]
}

/// Generate a content type.
pub fn content_type() -> impl Strategy<Value = ContentType> {
    prop::sample::select(ContentType::ALL.to_vec())
}

/// Generate a set of content ids, possibly empty.
pub fn content_id_set(max_len: usize) -> impl Strategy<Value = ContentIdSet> {
    prop::collection::btree_set(content_id(), 0..=max_len)
        .prop_map(|ids| ids.into_iter().collect())
}

/// A single grant mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOp {
    Add {
        user_id: UserId,
        action: Action,
        content_id: ContentId,
    },
    Remove {
        user_id: UserId,
        content_id: ContentId,
    },
    Retarget {
        user_id: UserId,
        action: Action,
        content_id: ContentId,
    },
}

/// Generate a grant mutation. The caller picks the content type.
pub fn grant_op() -> impl Strategy<Value = GrantOp> {
    prop_oneof![
        3 => (user_id(), action(), content_id()).prop_map(|(user_id, action, content_id)| {
            GrantOp::Add { user_id, action, content_id }
        }),
        1 => (user_id(), content_id())
            .prop_map(|(user_id, content_id)| GrantOp::Remove { user_id, content_id }),
        2 => (user_id(), action(), content_id()).prop_map(|(user_id, action, content_id)| {
            GrantOp::Retarget { user_id, action, content_id }
        }),
    ]
}

/// Generate a sequence of grant mutations.
pub fn grant_ops(max_len: usize) -> impl Strategy<Value = Vec<GrantOp>> {
    prop::collection::vec(grant_op(), 0..=max_len)
}

/// Raw grant rows to seed a store with, bypassing the mutator.
///
/// Rows may overlap across tiers, and a key may repeat. Evaluation has to
/// cope with both.
#[derive(Debug, Clone)]
pub struct GrantSetParams {
    pub content_type: ContentType,
    pub rows: Vec<NewGrant>,
}

impl Arbitrary for GrantSetParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            content_type(),
            prop::collection::vec((user_id(), action(), content_id_set(6)), 0..=12),
        )
            .prop_map(|(content_type, rows)| GrantSetParams {
                content_type,
                rows: rows
                    .into_iter()
                    .filter(|(_, _, ids)| !ids.is_empty())
                    .map(|(user_id, action, ids)| {
                        NewGrant::new(GrantKey::new(user_id, content_type, action), ids)
                    })
                    .collect(),
            })
            .boxed()
    }
}

impl GrantSetParams {
    /// The highest tier any row gives `user_id` on `content_id`.
    pub fn expected_level(&self, user_id: UserId, content_id: ContentId) -> PermissionLevel {
        self.rows
            .iter()
            .filter(|row| row.user_id == user_id && row.content_ids.contains(content_id))
            .map(|row| row.action.level())
            .max()
            .unwrap_or(PermissionLevel::None)
    }
}

/// Reference model of one content type's grants: which tiers mention which
/// ids, per user. Row layout is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantModel {
    tiers: BTreeMap<(UserId, Action), BTreeSet<ContentId>>,
}

impl GrantModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: GrantOp) {
        match op {
            GrantOp::Add {
                user_id,
                action,
                content_id,
            } => {
                self.tiers
                    .entry((user_id, action))
                    .or_default()
                    .insert(content_id);
            }
            GrantOp::Remove {
                user_id,
                content_id,
            } => self.remove_except(user_id, content_id, None),
            GrantOp::Retarget {
                user_id,
                action,
                content_id,
            } => {
                self.remove_except(user_id, content_id, Some(action));
                self.tiers
                    .entry((user_id, action))
                    .or_default()
                    .insert(content_id);
            }
        }
    }

    fn remove_except(&mut self, user_id: UserId, content_id: ContentId, keep: Option<Action>) {
        for action in Action::ALL {
            if Some(action) == keep {
                continue;
            }
            if let Some(ids) = self.tiers.get_mut(&(user_id, action)) {
                ids.remove(&content_id);
            }
        }
        self.tiers.retain(|_, ids| !ids.is_empty());
    }

    /// Ids a user holds at exactly `action`.
    pub fn ids(&self, user_id: UserId, action: Action) -> BTreeSet<ContentId> {
        self.tiers
            .get(&(user_id, action))
            .cloned()
            .unwrap_or_default()
    }

    /// Users mentioned by any tier.
    pub fn users(&self) -> BTreeSet<UserId> {
        self.tiers.keys().map(|(user_id, _)| *user_id).collect()
    }
}
