//! 有限オートマトンの遷移表。
//!
//! 状態ごとに 1 行、入力記号ごとに 1 列を持つ。NFA の表には ε 遷移で到達できる
//! 状態を並べる [`EPSILON_CLOSURE`] 列が最後に付く。行のラベルには受理状態なら
//! [`ACCEPTING_MARKER`]、状態 1 なら [`START_MARKER`] をこの順に付ける (`1 ✓ >`)。
//!
//! 端末への出力では、受理状態のラベルを太字の緑、それ以外の状態を青、
//! 開始マーカーを黄色で表示する。見出しは太字、ヘッダ行は青。
use colorful::Colorful;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
    io,
};
use tabled::{builder::Builder, settings::Style, Table};

/// NFA の表で ε 閉包を並べる列。
pub const EPSILON_CLOSURE: &str = "ε*";
pub const START_MARKER: &str = ">";
pub const ACCEPTING_MARKER: &str = "✓";

pub const NFA_CAPTION: &str = "NFA transition table:";
pub const DFA_CAPTION: &str = "DFA: Original transition table:";
pub const MINIMIZED_DFA_CAPTION: &str = "DFA: Minimized transition table:";

/// 遷移表を描くためのオートマトンへの読み取りアクセス。
pub trait Automaton {
    /// 列の順に並べた入力記号。ε は含まない。
    fn alphabet(&self) -> Vec<String>;

    /// 状態番号から記号、記号から遷移先への対応。
    fn transition_table(&self) -> BTreeMap<usize, BTreeMap<String, Cell>>;

    fn accepting_states(&self) -> BTreeSet<usize>;
}

/// 遷移先。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    Single(usize),
    /// オートマトンが並べた順の状態。
    Multiple(Vec<usize>),
}

impl From<Vec<usize>> for Cell {
    fn from(mut states: Vec<usize>) -> Self {
        match states.len() {
            0 => Cell::Empty,
            1 => Cell::Single(states.remove(0)),
            _ => Cell::Multiple(states),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Single(n) => write!(f, "{n}"),
            Cell::Multiple(states) => match states.as_slice() {
                [n] => write!(f, "{n}"),
                states => {
                    let joined: Vec<String> = states.iter().map(ToString::to_string).collect();
                    write!(f, "{{{}}}", joined.join(","))
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub state: usize,
    pub accepting: bool,
    /// 色なしのラベル。[`state_label`] を参照。
    pub label: String,
    pub cells: Vec<String>,
}

impl Row {
    fn painted_label(&self) -> String {
        let mut label = if self.accepting {
            format!("{} {ACCEPTING_MARKER}", self.state)
                .green()
                .bold()
                .to_string()
        } else {
            self.state.to_string().blue().to_string()
        };
        if self.state == 1 {
            label.push_str(&format!(" {START_MARKER}").yellow().to_string());
        }
        label
    }
}

/// 文字列に変換済みの遷移表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    caption: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TransitionTable {
    fn new<A: Automaton + ?Sized>(automaton: &A, caption: &str, columns: Vec<String>) -> Self {
        let accepting = automaton.accepting_states();
        let rows = automaton
            .transition_table()
            .iter()
            .map(|(&state, row)| Row {
                state,
                accepting: accepting.contains(&state),
                label: state_label(state, &accepting),
                cells: columns
                    .iter()
                    .map(|symbol| row.get(symbol).map(ToString::to_string).unwrap_or_default())
                    .collect(),
            })
            .collect();

        TransitionTable {
            caption: caption.to_string(),
            columns,
            rows,
        }
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// 空のラベル列に続く列名。
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn to_table(&self, color: bool) -> Table {
        let mut builder = Builder::default();
        let header = self.columns.iter().map(|c| match color {
            true => c.as_str().blue().to_string(),
            false => c.clone(),
        });
        builder.push_record(std::iter::once(String::new()).chain(header));
        for row in &self.rows {
            let label = match color {
                true => row.painted_label(),
                false => row.label.clone(),
            };
            builder.push_record(std::iter::once(label).chain(row.cells.iter().cloned()));
        }
        let mut table = builder.build();
        table.with(Style::modern());
        table
    }

    /// 見出し、表、凡例。`color` が true なら ANSI カラーを使う。
    pub fn render(&self, color: bool) -> String {
        let (caption, start, accepting) = if color {
            (
                self.caption.as_str().bold().to_string(),
                START_MARKER.yellow().bold().to_string(),
                ACCEPTING_MARKER.green().bold().to_string(),
            )
        } else {
            (
                self.caption.clone(),
                START_MARKER.to_string(),
                ACCEPTING_MARKER.to_string(),
            )
        };
        format!(
            "{caption}\n\n{}\n\n{start} - starting\n{accepting} - accepting\n",
            self.to_table(color)
        )
    }
}

impl Display for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// `n` に、該当すれば受理マーカー、開始マーカーの順で続けたもの。
pub fn state_label(state: usize, accepting: &BTreeSet<usize>) -> String {
    let mut label = state.to_string();
    if accepting.contains(&state) {
        label.push(' ');
        label.push_str(ACCEPTING_MARKER);
    }
    if state == 1 {
        label.push(' ');
        label.push_str(START_MARKER);
    }
    label
}

/// NFA の遷移表。ε 閉包の列が最後に来る。
pub fn nfa_table<A: Automaton + ?Sized>(nfa: &A) -> TransitionTable {
    let mut columns = nfa.alphabet();
    columns.push(EPSILON_CLOSURE.to_string());
    TransitionTable::new(nfa, NFA_CAPTION, columns)
}

/// DFA の遷移表。`caption` を省略すると [`DFA_CAPTION`]。
pub fn dfa_table<A: Automaton + ?Sized>(dfa: &A, caption: Option<&str>) -> TransitionTable {
    TransitionTable::new(dfa, caption.unwrap_or(DFA_CAPTION), dfa.alphabet())
}

pub fn render_nfa<A, W>(nfa: &A, out: &mut W) -> io::Result<()>
where
    A: Automaton + ?Sized,
    W: io::Write,
{
    write!(out, "{}", nfa_table(nfa))
}

pub fn render_dfa<A, W>(dfa: &A, caption: Option<&str>, out: &mut W) -> io::Result<()>
where
    A: Automaton + ?Sized,
    W: io::Write,
{
    write!(out, "{}", dfa_table(dfa, caption))
}
