//! Bookshelf repository
//!
//! The user's reading list, keyed by exact title. Every mutation writes the
//! full collection back to the store under [`BOOKS_KEY`].

use crate::domain::SkillDomain;
use crate::store::{SharedStore, BOOKS_KEY};
use crate::{Result, UpskillError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A book saved on the shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub author: String,
    pub category: SkillDomain,
    #[serde(default)]
    pub read: bool,
    pub date_added: DateTime<Utc>,
}

/// Which books a listing includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShelfFilter {
    #[default]
    All,
    ReadOnly,
    Unread,
}

impl ShelfFilter {
    fn matches(&self, book: &Book) -> bool {
        match self {
            Self::All => true,
            Self::ReadOnly => book.read,
            Self::Unread => !book.read,
        }
    }
}

impl std::str::FromStr for ShelfFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "read" => Ok(Self::ReadOnly),
            "unread" => Ok(Self::Unread),
            other => Err(format!("unknown filter '{}' (expected all, read or unread)", other)),
        }
    }
}

/// Outcome of adding a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(Book),
    AlreadyPresent,
}

pub struct Bookshelf {
    store: SharedStore,
    /// Insertion order; listings sort a copy
    books: Vec<Book>,
}

impl Bookshelf {
    /// Load the shelf from `store`.
    ///
    /// A missing or malformed collection starts an empty shelf; a store that
    /// cannot be read is an error, so the next write cannot clobber it.
    /// Stored duplicates are dropped, keeping the first.
    pub fn load(store: SharedStore) -> Result<Self> {
        let stored = match store.load::<Vec<Book>>(BOOKS_KEY) {
            Ok(books) => books.unwrap_or_default(),
            Err(UpskillError::Json(e)) => {
                warn!("Failed to parse stored bookshelf, starting empty: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut seen = HashSet::new();
        let books: Vec<Book> = stored
            .into_iter()
            .filter(|book| seen.insert(book.title.clone()))
            .collect();

        info!("Loaded bookshelf with {} books", books.len());
        Ok(Self { store, books })
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Exact-title lookup
    pub fn contains(&self, title: &str) -> bool {
        self.get(title).is_some()
    }

    pub fn get(&self, title: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.title == title)
    }

    /// Add a book stamped with the current time
    pub fn add(&mut self, title: &str, author: &str, category: SkillDomain) -> Result<AddOutcome> {
        self.add_at(title, author, category, Utc::now())
    }

    /// Add a book with an explicit `date_added`
    pub fn add_at(
        &mut self,
        title: &str,
        author: &str,
        category: SkillDomain,
        date_added: DateTime<Utc>,
    ) -> Result<AddOutcome> {
        if self.contains(title) {
            debug!("'{}' already on the shelf", title);
            return Ok(AddOutcome::AlreadyPresent);
        }

        let book = Book {
            title: title.to_string(),
            author: author.to_string(),
            category,
            read: false,
            date_added,
        };
        let mut books = self.books.clone();
        books.push(book.clone());
        self.commit(books)?;

        info!("Added '{}' by {} to the shelf", book.title, book.author);
        Ok(AddOutcome::Added(book))
    }

    /// Flip the read flag of `title`, returning the new value.
    ///
    /// Unknown titles are left alone and yield `None`.
    pub fn toggle_read(&mut self, title: &str) -> Result<Option<bool>> {
        let Some(index) = self.books.iter().position(|b| b.title == title) else {
            debug!("toggle_read: '{}' not on the shelf", title);
            return Ok(None);
        };

        let mut books = self.books.clone();
        books[index].read = !books[index].read;
        let read = books[index].read;
        self.commit(books)?;
        Ok(Some(read))
    }

    /// Remove every book
    pub fn clear(&mut self) -> Result<()> {
        let removed = self.books.len();
        self.commit(Vec::new())?;
        info!("Cleared {} books from the shelf", removed);
        Ok(())
    }

    /// Books matching `filter`, most recently added first.
    ///
    /// Books added at the same instant keep their insertion order.
    pub fn list(&self, filter: ShelfFilter) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .books
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        books
    }

    /// Titles marked as read, in insertion order
    pub fn read_titles(&self) -> Vec<String> {
        self.books
            .iter()
            .filter(|b| b.read)
            .map(|b| b.title.clone())
            .collect()
    }

    /// Write `books` to the store, replacing the in-memory shelf only once
    /// the write has succeeded
    fn commit(&mut self, books: Vec<Book>) -> Result<()> {
        self.store.save(BOOKS_KEY, &books)?;
        self.books = books;
        Ok(())
    }
}
