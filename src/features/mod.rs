pub mod ads;
pub mod health;
