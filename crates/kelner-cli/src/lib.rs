//! Demo wiring for the `kelner` binary: an embedded Polish catalog and
//! engine construction helpers shared by the subcommands.

pub mod demo;
