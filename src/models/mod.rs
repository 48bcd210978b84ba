//! Data models for the library server

pub mod author;
pub mod book;
pub mod book_author;
pub mod enums;
pub mod genre;
pub mod order;
pub mod review;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails};
pub use book_author::BookAuthorName;
pub use enums::{OrderStatus, UserRole, UserStatus};
pub use genre::Genre;
pub use order::Order;
pub use review::Review;
pub use user::{Identity, User};
