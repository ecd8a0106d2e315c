//! # 正規表現インスペクタ用クレート
//!
//! 正規表現を解析し、AST の JSON、最適化後の式、互換変換後の式、
//! NFA と DFA の遷移表を出力する。
//!
//! ## 利用例
//!
//! ```
//! use retree::{engine, table};
//!
//! assert_eq!(engine::optimize("/a{1,}/").unwrap(), "/a+/"); // a{1,} は a+ になる
//!
//! let mut dfa = engine::to_dfa("a*").unwrap();
//! print!("{}", table::dfa_table(&dfa, None)); // 最小化前の DFA
//! dfa.minimize();
//! print!("{}", table::dfa_table(&dfa, Some(table::MINIMIZED_DFA_CAPTION)));
//! ```
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod helper;
pub mod table;

pub use dispatch::run;
