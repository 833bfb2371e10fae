pub mod collar;
