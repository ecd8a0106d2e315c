use super::{builder::Graph, EPSILON, START_STATE};
use crate::table::{Automaton, Cell, EPSILON_CLOSURE};
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet};

/// 状態番号が 1 から始まる ε-NFA。
///
/// 開始状態からの深さ優先探索の順に番号を振るため、開始状態は常に 1 で、
/// すべての状態に到達できる。
#[derive(Debug, Clone)]
pub struct Nfa {
    alphabet: Vec<String>,
    /// `states[n - 1]` が状態 `n` の辺。
    states: Vec<IndexMap<String, Vec<usize>>>,
    accepting: BTreeSet<usize>,
}

impl Nfa {
    pub fn from_graph(graph: Graph) -> Self {
        let mut numbers: Vec<Option<usize>> = vec![None; graph.edges.len()];
        let mut order = Vec::new();
        let mut stack = vec![graph.start];
        while let Some(id) = stack.pop() {
            if numbers[id].is_some() {
                continue;
            }
            order.push(id);
            numbers[id] = Some(order.len());
            for dests in graph.edges[id].values().rev() {
                for &d in dests.iter().rev() {
                    if numbers[d].is_none() {
                        stack.push(d);
                    }
                }
            }
        }

        let mut alphabet = IndexSet::new();
        let states = order
            .iter()
            .map(|&id| {
                graph.edges[id]
                    .iter()
                    .map(|(symbol, dests)| {
                        if symbol != EPSILON {
                            alphabet.insert(symbol.clone());
                        }
                        let mut dests: Vec<usize> =
                            dests.iter().filter_map(|&d| numbers[d]).collect();
                        dests.sort_unstable();
                        (symbol.clone(), dests)
                    })
                    .collect()
            })
            .collect();

        Nfa {
            alphabet: alphabet.into_iter().collect(),
            states,
            accepting: numbers[graph.accept].into_iter().collect(),
        }
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// 初出順の入力記号。ε は含まない。
    pub fn input_alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn accepting(&self) -> &BTreeSet<usize> {
        &self.accepting
    }

    fn targets(&self, state: usize, symbol: &str) -> &[usize] {
        state
            .checked_sub(1)
            .and_then(|i| self.states.get(i))
            .and_then(|edges| edges.get(symbol))
            .map_or(&[], Vec::as_slice)
    }

    /// `state` から 1 回以上の ε 遷移で到達できる状態。
    pub fn epsilon_moves(&self, state: usize) -> BTreeSet<usize> {
        let mut reached = BTreeSet::new();
        let mut stack = self.targets(state, EPSILON).to_vec();
        while let Some(s) = stack.pop() {
            if reached.insert(s) {
                stack.extend_from_slice(self.targets(s, EPSILON));
            }
        }
        reached
    }

    /// `states` と、そこから ε 遷移で到達できるすべての状態。
    pub fn closure(&self, states: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut closure = states.clone();
        for &s in states {
            closure.extend(self.epsilon_moves(s));
        }
        closure
    }

    /// `states` から `symbol` で遷移した先の ε 閉包。
    pub fn step(&self, states: &BTreeSet<usize>, symbol: &str) -> BTreeSet<usize> {
        let moved: BTreeSet<usize> = states
            .iter()
            .flat_map(|&s| self.targets(s, symbol).iter().copied())
            .collect();
        self.closure(&moved)
    }

    pub fn initial_set(&self) -> BTreeSet<usize> {
        self.closure(&BTreeSet::from([START_STATE]))
    }
}

impl Automaton for Nfa {
    fn alphabet(&self) -> Vec<String> {
        self.alphabet.clone()
    }

    fn transition_table(&self) -> BTreeMap<usize, BTreeMap<String, Cell>> {
        (1..=self.states.len())
            .zip(&self.states)
            .map(|(state, edges)| {
                let mut row: BTreeMap<String, Cell> = edges
                    .iter()
                    .filter(|(symbol, _)| *symbol != EPSILON)
                    .map(|(symbol, dests)| (symbol.clone(), Cell::from(dests.clone())))
                    .collect();
                let moves = self.epsilon_moves(state);
                if !moves.is_empty() {
                    row.insert(
                        EPSILON_CLOSURE.to_string(),
                        Cell::from(moves.into_iter().collect::<Vec<_>>()),
                    );
                }
                (state, row)
            })
            .collect()
    }

    fn accepting_states(&self) -> BTreeSet<usize> {
        self.accepting.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fa::to_nfa;

    #[test]
    fn test_alternation() {
        let nfa = to_nfa("a|b").unwrap();
        assert_eq!(nfa.alphabet(), vec!["a", "b"]);
        assert_eq!(nfa.num_states(), 4);
        assert_eq!(nfa.accepting_states(), BTreeSet::from([3]));

        let table = nfa.transition_table();
        assert_eq!(table.len(), 4);
        // ε 遷移を持つのは開始状態だけで、行き先は両方の枝の先頭
        let with_epsilon: Vec<_> = table
            .iter()
            .filter(|(_, row)| row.contains_key(EPSILON_CLOSURE))
            .map(|(state, _)| *state)
            .collect();
        assert_eq!(with_epsilon, vec![1]);
        assert_eq!(table[&1][EPSILON_CLOSURE], Cell::Multiple(vec![2, 4]));
        assert_eq!(table[&2]["a"], Cell::Single(3));
        assert_eq!(table[&4]["b"], Cell::Single(3));
    }

    #[test]
    fn test_star_closure() {
        // 1 -ε-> 2 -a-> 3 -ε-> 2, 2 -ε-> 4
        let nfa = to_nfa("a*").unwrap();
        assert_eq!(nfa.num_states(), 4);
        assert_eq!(nfa.accepting(), &BTreeSet::from([4]));
        assert_eq!(nfa.epsilon_moves(1), BTreeSet::from([2, 4]));
        assert_eq!(nfa.epsilon_moves(3), BTreeSet::from([2, 4]));
        assert_eq!(nfa.epsilon_moves(4), BTreeSet::new());
        assert_eq!(nfa.initial_set(), BTreeSet::from([1, 2, 4]));
        assert_eq!(
            nfa.step(&nfa.initial_set(), "a"),
            BTreeSet::from([2, 3, 4])
        );
    }

    #[test]
    fn test_epsilon_cycle_includes_self() {
        // (a?)* はループの先頭を通る ε の閉路を持つ
        let nfa = to_nfa("(a?)*").unwrap();
        let table = nfa.transition_table();
        let on_cycle = table.iter().any(|(state, row)| match row.get(EPSILON_CLOSURE) {
            Some(Cell::Multiple(states)) => states.contains(state),
            Some(Cell::Single(s)) => s == state,
            _ => false,
        });
        assert!(on_cycle);
    }

    #[test]
    fn test_empty_expression() {
        let nfa = to_nfa("//").unwrap();
        assert_eq!(nfa.num_states(), 2);
        assert_eq!(nfa.alphabet(), Vec::<String>::new());
        assert_eq!(nfa.accepting_states(), BTreeSet::from([2]));
    }
}
