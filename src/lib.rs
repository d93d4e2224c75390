pub mod api;
pub mod config;
pub mod crypto;
pub mod currency;
pub mod domain;
pub mod error;
pub mod payments;
pub mod repository;
pub mod service;
pub mod storage;
