//! AST から Thompson 構成法で ε-NFA のグラフを作る。
use super::{FaError, EPSILON};
use crate::{
    engine::ast::{Char, CharKind, Node, RegExp},
    helper::safe_add,
};
use indexmap::IndexMap;

/// `{n}`、`{n,}`、`{n,m}` で受け付ける最大の回数。
pub const MAX_REPETITION: usize = 1000;

/// ある状態から出る辺。キーは入力記号か [`EPSILON`]。
pub type Edges = IndexMap<String, Vec<usize>>;

/// 構成直後のオートマトンのグラフ。
///
/// 状態 ID は `edges` の添字で、割り当て順でしかない。
#[derive(Debug, Default)]
pub struct Graph {
    pub edges: Vec<Edges>,
    pub start: usize,
    pub accept: usize,
}

/// 開始状態と受理状態をひとつずつ持つグラフを作る。
pub fn build(re: &RegExp) -> Result<Graph, FaError> {
    let mut builder = Builder::default();
    let start = builder.new_state()?;
    let accept = builder.new_state()?;
    builder.compile_opt(re.body.as_ref(), start, accept)?;
    Ok(Graph {
        edges: builder.edges,
        start,
        accept,
    })
}

/// 文字が遷移する列のラベル。
pub fn symbol_of(c: &Char) -> String {
    match (c.kind, c.symbol) {
        (CharKind::Meta, _) | (_, None) => c.value.clone(),
        (CharKind::Simple, Some(_)) if c.escaped => format!("\\{}", c.value),
        (_, Some(s)) => s.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    Once,
    Optional,
    Star,
}

#[derive(Default)]
struct Builder {
    edges: Vec<Edges>,
    count: usize,
}

impl Builder {
    fn new_state(&mut self) -> Result<usize, FaError> {
        let id = self.count;
        safe_add(&mut self.count, &1, || FaError::StateOverflow)?;
        self.edges.push(Edges::new());
        Ok(id)
    }

    fn add_edge(&mut self, from: usize, symbol: &str, to: usize) {
        let dests = self.edges[from].entry(symbol.to_string()).or_default();
        if !dests.contains(&to) {
            dests.push(to);
        }
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.add_edge(from, EPSILON, to);
    }

    /// `node` にマッチする断片で `from` と `to` をつなぐ。
    fn compile(&mut self, node: &Node, from: usize, to: usize) -> Result<(), FaError> {
        match node {
            Node::Char(c) => {
                self.add_edge(from, &symbol_of(c), to);
                Ok(())
            }
            Node::Alternative { expressions, .. } => {
                let pieces: Vec<_> = expressions.iter().map(|e| (e, Piece::Once)).collect();
                self.compile_chain(&pieces, from, to)
            }
            Node::Disjunction { .. } => {
                let mut branches = Vec::new();
                collect_branches(node, &mut branches);
                for branch in branches {
                    match branch {
                        Some(b) => {
                            let s = self.new_state()?;
                            self.epsilon(from, s);
                            self.compile(b, s, to)?;
                        }
                        None => self.epsilon(from, to),
                    }
                }
                Ok(())
            }
            Node::Group { expression, .. } => self.compile_opt(expression.as_deref(), from, to),
            Node::Repetition {
                expression,
                quantifier,
                ..
            } => match quantifier.bounds() {
                (0, None) => self.compile_piece(expression, Piece::Star, from, to),
                (0, Some(1)) => self.compile_piece(expression, Piece::Optional, from, to),
                (min, max) => {
                    let expression: &Node = expression;
                    let upper = max.unwrap_or(min).max(min);
                    if upper > MAX_REPETITION {
                        return Err(FaError::RepetitionTooLarge(upper));
                    }
                    let mut pieces = vec![(expression, Piece::Once); min];
                    match max {
                        None => pieces.push((expression, Piece::Star)),
                        Some(max) => {
                            for _ in min..max {
                                pieces.push((expression, Piece::Optional));
                            }
                        }
                    }
                    self.compile_chain(&pieces, from, to)
                }
            },
            other => Err(FaError::Unsupported(other.type_name())),
        }
    }

    fn compile_opt(&mut self, node: Option<&Node>, from: usize, to: usize) -> Result<(), FaError> {
        match node {
            Some(n) => self.compile(n, from, to),
            None => {
                self.epsilon(from, to);
                Ok(())
            }
        }
    }

    /// 各要素の間に新しい状態を挟んで連結する。
    fn compile_chain(
        &mut self,
        pieces: &[(&Node, Piece)],
        from: usize,
        to: usize,
    ) -> Result<(), FaError> {
        if pieces.is_empty() {
            self.epsilon(from, to);
            return Ok(());
        }

        let mut current = from;
        for (i, &(node, piece)) in pieces.iter().enumerate() {
            let next = if i + 1 == pieces.len() {
                to
            } else {
                self.new_state()?
            };
            self.compile_piece(node, piece, current, next)?;
            current = next;
        }
        Ok(())
    }

    fn compile_piece(
        &mut self,
        node: &Node,
        piece: Piece,
        from: usize,
        to: usize,
    ) -> Result<(), FaError> {
        match piece {
            Piece::Once => self.compile(node, from, to),
            Piece::Optional => {
                self.compile(node, from, to)?;
                self.epsilon(from, to);
                Ok(())
            }
            Piece::Star => {
                // from -ε-> s -node-> t -ε-> s -ε-> to
                let s = self.new_state()?;
                let t = self.new_state()?;
                self.epsilon(from, s);
                self.compile(node, s, t)?;
                self.epsilon(t, s);
                self.epsilon(s, to);
                Ok(())
            }
        }
    }
}

fn collect_branches<'a>(node: &'a Node, out: &mut Vec<Option<&'a Node>>) {
    match node {
        Node::Disjunction { left, right, .. } => {
            match left.as_deref() {
                Some(l) => collect_branches(l, out),
                None => out.push(None),
            }
            out.push(right.as_deref());
        }
        other => out.push(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::{parse, ParseOptions};

    fn graph(expr: &str) -> Graph {
        build(&parse(expr, ParseOptions::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_single_char() {
        let g = graph("a");
        assert_eq!(g.edges.len(), 2);
        assert_eq!(g.edges[g.start]["a"], vec![g.accept]);
        assert!(g.edges[g.accept].is_empty());
    }

    #[test]
    fn test_labels() {
        let g = graph("\\.\\x41.\\n");
        let labels: Vec<_> = g
            .edges
            .iter()
            .flat_map(|e| e.keys().cloned())
            .collect();
        assert_eq!(labels, vec!["\\.", "A", ".", "\\n"]);
    }

    #[test]
    fn test_empty_branch_is_epsilon() {
        let g = graph("a|");
        assert!(g.edges[g.start][EPSILON].contains(&g.accept));
    }

    #[test]
    fn test_counted_repetition() {
        // {2,3}: 必須の 2 つと省略可能な 1 つ
        let g = graph("a{2,3}");
        let moves: usize = g.edges.iter().filter_map(|e| e.get("a")).map(Vec::len).sum();
        assert_eq!(moves, 3);
        // {0} は空文字列にだけマッチする
        let g = graph("a{0}");
        assert_eq!(g.edges[g.start][EPSILON], vec![g.accept]);
    }
}
