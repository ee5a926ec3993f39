pub mod authors;
pub mod books;
pub mod health;
pub mod reviews;
