#![forbid(unsafe_code)]

mod snapshot;

pub use snapshot::EntitySnapshot;

pub mod ids {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    pub const ITEM_ID_PREFIX: &str = "wt-";
    pub const BOARD_ID_PREFIX: &str = "bd-";

    /// Source of fresh identifiers for newly created entities.
    ///
    /// The store owns one generator and calls it on every creation attempt, so a
    /// collision retry always sees a new candidate.
    pub trait IdGenerator: Send {
        fn next_id(&mut self, prefix: &str) -> String;
    }

    #[derive(Debug)]
    pub struct RandomIdGenerator {
        rng: StdRng,
    }

    impl RandomIdGenerator {
        pub fn new() -> Self {
            Self {
                rng: StdRng::from_entropy(),
            }
        }

        pub fn seeded(seed: u64) -> Self {
            Self {
                rng: StdRng::seed_from_u64(seed),
            }
        }
    }

    impl Default for RandomIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for RandomIdGenerator {
        fn next_id(&mut self, prefix: &str) -> String {
            let value: u32 = self.rng.gen_range(0..0x0100_0000);
            format!("{prefix}{value:06x}")
        }
    }

    /// Replays a scripted list of identifiers, then falls back to a counter.
    #[derive(Debug, Default)]
    pub struct ScriptedIdGenerator {
        scripted: VecDeque<String>,
        counter: u64,
    }

    impl ScriptedIdGenerator {
        pub fn new<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                scripted: ids.into_iter().map(Into::into).collect(),
                counter: 0,
            }
        }
    }

    impl IdGenerator for ScriptedIdGenerator {
        fn next_id(&mut self, prefix: &str) -> String {
            if let Some(id) = self.scripted.pop_front() {
                return id;
            }
            self.counter += 1;
            format!("{prefix}{:06}", self.counter)
        }
    }
}

pub mod model {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Status {
        Open,
        InProgress,
        InReview,
        Blocked,
        Closed,
    }

    impl Status {
        pub const ALL: [Status; 5] = [
            Status::Open,
            Status::InProgress,
            Status::InReview,
            Status::Blocked,
            Status::Closed,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Status::Open => "open",
                Status::InProgress => "in_progress",
                Status::InReview => "in_review",
                Status::Blocked => "blocked",
                Status::Closed => "closed",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .into_iter()
                .find(|status| status.as_str() == value.trim())
        }

        /// Progress rank used by cascades. `open` and `blocked` share the bottom rank.
        pub fn rank(self) -> u8 {
            match self {
                Status::Open | Status::Blocked => 0,
                Status::InProgress => 1,
                Status::InReview => 2,
                Status::Closed => 3,
            }
        }

        pub fn has_reached(self, target: Status) -> bool {
            self.rank() >= target.rank()
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ItemType {
        Bug,
        Feature,
        Task,
        Epic,
        Chore,
    }

    impl ItemType {
        pub const ALL: [ItemType; 5] = [
            ItemType::Bug,
            ItemType::Feature,
            ItemType::Task,
            ItemType::Epic,
            ItemType::Chore,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                ItemType::Bug => "bug",
                ItemType::Feature => "feature",
                ItemType::Task => "task",
                ItemType::Epic => "epic",
                ItemType::Chore => "chore",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .into_iter()
                .find(|kind| kind.as_str() == value.trim())
        }

        pub fn is_container(self) -> bool {
            matches!(self, ItemType::Epic)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ActionKind {
        Create,
        Update,
        Delete,
        Start,
        Review,
        /// Review verdicts. Reserved for external review workflows; the store
        /// itself never records them.
        Approve,
        Reject,
        Close,
        Reopen,
        Block,
        Unblock,
        AddDependency,
        RemoveDependency,
        BoardSetPosition,
        BoardUnposition,
        BoardSwap,
    }

    impl ActionKind {
        pub const ALL: [ActionKind; 16] = [
            ActionKind::Create,
            ActionKind::Update,
            ActionKind::Delete,
            ActionKind::Start,
            ActionKind::Review,
            ActionKind::Approve,
            ActionKind::Reject,
            ActionKind::Close,
            ActionKind::Reopen,
            ActionKind::Block,
            ActionKind::Unblock,
            ActionKind::AddDependency,
            ActionKind::RemoveDependency,
            ActionKind::BoardSetPosition,
            ActionKind::BoardUnposition,
            ActionKind::BoardSwap,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                ActionKind::Create => "create",
                ActionKind::Update => "update",
                ActionKind::Delete => "delete",
                ActionKind::Start => "start",
                ActionKind::Review => "review",
                ActionKind::Approve => "approve",
                ActionKind::Reject => "reject",
                ActionKind::Close => "close",
                ActionKind::Reopen => "reopen",
                ActionKind::Block => "block",
                ActionKind::Unblock => "unblock",
                ActionKind::AddDependency => "add_dependency",
                ActionKind::RemoveDependency => "remove_dependency",
                ActionKind::BoardSetPosition => "board_set_position",
                ActionKind::BoardUnposition => "board_unposition",
                ActionKind::BoardSwap => "board_swap",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .into_iter()
                .find(|kind| kind.as_str() == value.trim())
        }

        /// Kind recorded for a plain status transition.
        pub fn for_transition(from: Status, to: Status) -> Self {
            match (from, to) {
                (_, Status::Closed) => ActionKind::Close,
                (Status::Closed, _) => ActionKind::Reopen,
                (_, Status::InReview) => ActionKind::Review,
                (_, Status::InProgress) => ActionKind::Start,
                (_, Status::Blocked) => ActionKind::Block,
                (Status::Blocked, Status::Open) => ActionKind::Unblock,
                _ => ActionKind::Update,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EntityType {
        Item,
        Dependency,
        Board,
        BoardPosition,
        Log,
        Comment,
        /// Comments and session tags are written by external collaborators;
        /// they are listed here so the audit-only filter recognizes them.
        WorkSessionItem,
    }

    impl EntityType {
        pub const ALL: [EntityType; 7] = [
            EntityType::Item,
            EntityType::Dependency,
            EntityType::Board,
            EntityType::BoardPosition,
            EntityType::Log,
            EntityType::Comment,
            EntityType::WorkSessionItem,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                EntityType::Item => "issue",
                EntityType::Dependency => "issue_dependency",
                EntityType::Board => "board",
                EntityType::BoardPosition => "board_issue_position",
                EntityType::Log => "log",
                EntityType::Comment => "comment",
                EntityType::WorkSessionItem => "work_session_issue",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .into_iter()
                .find(|kind| kind.as_str() == value.trim())
        }

        /// Entity types that stay in the audit trail but are never offered for undo.
        pub fn is_audit_only(self) -> bool {
            matches!(
                self,
                EntityType::Log | EntityType::Comment | EntityType::WorkSessionItem
            )
        }

        pub fn audit_only() -> impl Iterator<Item = EntityType> {
            Self::ALL.into_iter().filter(|kind| kind.is_audit_only())
        }
    }
}
