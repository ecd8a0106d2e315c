//! 正規表現から作る有限オートマトン。
//!
//! 対応するのは文字、`.`、選択、連接、グループ、繰り返しだけで、フラグは無視する。
pub mod builder;
pub mod dfa;
pub mod nfa;

use super::parser::{parse, ParseError, ParseOptions};
use log::debug;
use std::{
    error::Error,
    fmt::{self, Display},
};

pub use dfa::Dfa;
pub use nfa::Nfa;

/// NFA の行における ε 遷移のキー。
pub const EPSILON: &str = "ε";

/// 開始状態の番号。
pub const START_STATE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaError {
    Parse(ParseError),
    Unsupported(&'static str),
    RepetitionTooLarge(usize),
    StateOverflow,
}

impl Display for FaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaError::Parse(e) => e.fmt(f),
            FaError::Unsupported(node) => {
                write!(f, "FaError: {node} is not supported in NFA/DFA")
            }
            FaError::RepetitionTooLarge(n) => {
                write!(f, "FaError: repetition count {n} exceeds {}", builder::MAX_REPETITION)
            }
            FaError::StateOverflow => write!(f, "FaError: too many states"),
        }
    }
}

impl Error for FaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FaError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for FaError {
    fn from(e: ParseError) -> Self {
        FaError::Parse(e)
    }
}

/// 正規表現の NFA を作る。
pub fn to_nfa(expr: &str) -> Result<Nfa, FaError> {
    let re = parse(expr, ParseOptions::default())?;
    let nfa = Nfa::from_graph(builder::build(&re)?);
    debug!(
        "to_nfa: {} states, alphabet = {:?}",
        nfa.num_states(),
        nfa.input_alphabet()
    );
    Ok(nfa)
}

/// 正規表現の DFA を作る。最小化はしない。
pub fn to_dfa(expr: &str) -> Result<Dfa, FaError> {
    let dfa = Dfa::from_nfa(&to_nfa(expr)?);
    debug!("to_dfa: {} states", dfa.num_states());
    Ok(dfa)
}
