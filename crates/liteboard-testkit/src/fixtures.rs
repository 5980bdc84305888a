//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a board over an in-memory store,
//! a manual clock, and a directory of named users.

use std::sync::Arc;

use serde_json::json;

use liteboard::{Board, BoardConfig, MemoryContentRepository, MemoryDirectory};
use liteboard_core::{ContentId, ContentType, ManualClock, UserId, UserProfile};
use liteboard_store::MemoryStore;

/// Default fixture start time (Unix seconds).
pub const FIXTURE_START: i64 = 1_700_000_000;

/// A board wired to in-memory collaborators and a manual clock.
pub struct TestFixture {
    pub board: Board<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub content: Arc<MemoryContentRepository>,
    pub directory: Arc<MemoryDirectory>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(BoardConfig::default())
    }

    pub fn with_config(config: BoardConfig) -> Self {
        let clock = Arc::new(ManualClock::new(FIXTURE_START));
        let content = Arc::new(MemoryContentRepository::new());
        let directory = Arc::new(MemoryDirectory::new());
        let board = Board::new(
            MemoryStore::new(),
            content.clone(),
            directory.clone(),
            clock.clone(),
            config,
        );

        Self {
            board,
            clock,
            content,
            directory,
        }
    }

    /// Register a user named `name` with an `@example.com` address.
    pub fn add_user(&self, id: i64, name: &str) -> UserId {
        let user_id = UserId(id);
        self.directory
            .insert(UserProfile {
                id: user_id,
                username: name.to_string(),
                email: format!("{}@example.com", name),
            })
            .expect("directory lock poisoned");
        user_id
    }

    /// Create a project owned by `owner`.
    pub async fn create_project(&self, owner: UserId, name: &str) -> liteboard::Result<ContentId> {
        self.board
            .create_content(owner, ContentType::Project, json!({ "name": name }))
            .await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixture with users `1..=count`, named `user1`, `user2`, ...
pub fn multi_user_fixture(count: i64) -> TestFixture {
    let fixture = TestFixture::new();
    for id in 1..=count {
        fixture.add_user(id, &format!("user{}", id));
    }
    fixture
}
