//! fleet_rental - motor de ciclo de vida de contratos de alquiler
//!
//! Backend multi-tenant de operaciones de flota. El núcleo es el motor de
//! contratos: máquina de estados, guardia anti doble reserva y sweeper de
//! reconciliación contra el reloj.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
