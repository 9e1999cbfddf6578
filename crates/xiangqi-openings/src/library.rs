//! A collection of named opening books with one active at a time.

use std::path::Path;

use xiangqi_engine::Position;

use crate::database::{DatabaseError, MoveDatabase, OpeningBook};

/// Named opening books, keyed by [`BookInfo::name`](crate::BookInfo).
///
/// Books keep the order they were added in. Probing consults only the
/// active book; a library without an active book never suggests a move.
#[derive(Debug, Clone, Default)]
pub struct BookLibrary {
    books: Vec<MoveDatabase>,
    active: Option<usize>,
}

impl BookLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Book names in the order they were added.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(|b| b.info().name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&MoveDatabase> {
        self.index_of(name).map(|i| &self.books[i])
    }

    /// The book probes are answered from.
    pub fn active(&self) -> Option<&MoveDatabase> {
        self.active.map(|i| &self.books[i])
    }

    /// Adds a book. The first book added becomes active.
    pub fn add(&mut self, book: MoveDatabase) -> Result<(), DatabaseError> {
        let name = book.info().name.clone();
        if self.index_of(&name).is_some() {
            return Err(DatabaseError::DuplicateBook(name));
        }
        tracing::debug!(%name, positions = book.len(), "opening book added");
        self.books.push(book);
        if self.active.is_none() {
            self.active = Some(self.books.len() - 1);
        }
        Ok(())
    }

    /// Loads a JSON book file and adds it.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), DatabaseError> {
        self.add(MoveDatabase::load(path)?)
    }

    /// Removes a book and returns it. Removing the active book leaves the
    /// library without one.
    pub fn remove(&mut self, name: &str) -> Result<MoveDatabase, DatabaseError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| DatabaseError::UnknownBook(name.to_string()))?;
        self.active = match self.active {
            Some(a) if a == index => None,
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        tracing::debug!(%name, "opening book removed");
        Ok(self.books.remove(index))
    }

    /// Replaces the book with the same name and returns the old one.
    pub fn update(&mut self, book: MoveDatabase) -> Result<MoveDatabase, DatabaseError> {
        let name = book.info().name.clone();
        let index = self
            .index_of(&name)
            .ok_or(DatabaseError::UnknownBook(name))?;
        Ok(std::mem::replace(&mut self.books[index], book))
    }

    /// Makes the named book the active one.
    pub fn select(&mut self, name: &str) -> Result<(), DatabaseError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| DatabaseError::UnknownBook(name.to_string()))?;
        self.active = Some(index);
        tracing::info!(%name, "opening book selected");
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.books.iter().position(|b| b.info().name == name)
    }
}

impl OpeningBook for BookLibrary {
    fn probe(&self, position: &Position) -> Option<String> {
        self.active()?.probe(position)
    }
}
