//! Compiled per-rule networks and class nodes.
//!
//! A rule compiles into a small data-driven graph rather than a set of
//! trait objects: per tuple type a filter chain ending in a one-column
//! alpha table, then a left-deep sequence of join stages, each writing
//! satisfying combinations into a beta table. The final table is the
//! rule's terminal node: every row inserted there is one completed match.

use std::fmt;
use std::sync::Arc;

use retenet_foundation::{ErrorKind, Result};
use retenet_model::Rule;

/// Entry point for all tuples of one type: an ordered list of links to the
/// rule networks that consume the type. Class nodes are shared across
/// rules; links are kept in rule registration order.
#[derive(Clone, Debug)]
pub(crate) struct ClassNode {
    name: Arc<str>,
    links: Vec<Arc<str>>,
}

impl ClassNode {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            links: Vec::new(),
        }
    }

    pub(crate) fn add_link(&mut self, rule_name: Arc<str>) {
        self.links.push(rule_name);
    }

    pub(crate) fn remove_link(&mut self, rule_name: &str) {
        self.links.retain(|l| l.as_ref() != rule_name);
    }

    pub(crate) fn links(&self) -> &[Arc<str>] {
        &self.links
    }
}

impl fmt::Display for ClassNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ClassNode {}", self.name)?;
        for link in &self.links {
            write!(f, " -> {link}")?;
        }
        write!(f, "]")
    }
}

/// Filter chain for one tuple type of one rule: the single-type condition
/// gates (indexes into the rule's condition list, declaration order) and
/// the alpha table the chain feeds.
#[derive(Clone, Debug)]
pub(crate) struct Chain {
    pub(crate) identifier: Arc<str>,
    pub(crate) filters: Vec<usize>,
    pub(crate) alpha: Arc<str>,
}

/// One join stage: cross-joins the accumulated left combinations with the
/// right-hand alpha table, gated by the multi-type conditions assigned to
/// this stage, writing satisfying combinations into `out`.
#[derive(Clone, Debug)]
pub(crate) struct JoinStage {
    pub(crate) conditions: Vec<usize>,
    pub(crate) left: Arc<str>,
    pub(crate) right: Arc<str>,
    pub(crate) out: Arc<str>,
}

/// A rule compiled into chains, stages, and table names.
#[derive(Clone, Debug)]
pub struct RuleNetwork {
    rule: Rule,
    seq: u64,
    pub(crate) identifiers: Vec<Arc<str>>,
    pub(crate) chains: Vec<Chain>,
    pub(crate) stages: Vec<JoinStage>,
    pub(crate) terminal: Arc<str>,
}

impl RuleNetwork {
    /// Compiles a rule into its network form.
    ///
    /// Identifiers are ordered by first appearance across the rule's
    /// conditions; that order is the join order. Each multi-type condition
    /// attaches to the earliest stage whose accumulated types cover it.
    ///
    /// # Errors
    /// Fails if the rule has no conditions or no action.
    pub fn compile(rule: Rule, seq: u64) -> Result<Self> {
        rule.validate()?;
        let identifiers = rule.identifiers();
        let rule_name = rule.name().clone();

        let mut chains: Vec<Chain> = identifiers
            .iter()
            .map(|ident| Chain {
                identifier: ident.clone(),
                filters: Vec::new(),
                alpha: format!("{rule_name}|a|{ident}").into(),
            })
            .collect();

        let mut stages: Vec<JoinStage> = (1..identifiers.len())
            .map(|i| {
                let left = if i == 1 {
                    chains[0].alpha.clone()
                } else {
                    Arc::from(format!("{rule_name}|b|{}", i - 1))
                };
                JoinStage {
                    conditions: Vec::new(),
                    left,
                    right: chains[i].alpha.clone(),
                    out: format!("{rule_name}|b|{i}").into(),
                }
            })
            .collect();

        for (ci, cond) in rule.conditions().iter().enumerate() {
            let mut unique: Vec<&Arc<str>> = Vec::new();
            for id in cond.identifiers() {
                if !unique.iter().any(|u| *u == id) {
                    unique.push(id);
                }
            }
            if unique.len() == 1 {
                let pos = position_of(&identifiers, unique[0], &rule)?;
                chains[pos].filters.push(ci);
            } else {
                // Earliest stage whose accumulated prefix covers every
                // identifier of the condition.
                let max_pos = unique
                    .iter()
                    .map(|id| position_of(&identifiers, id, &rule))
                    .try_fold(0, |acc, pos| pos.map(|p| acc.max(p)))?;
                stages[max_pos - 1].conditions.push(ci);
            }
        }

        let terminal = if let Some(last) = stages.last() {
            last.out.clone()
        } else {
            chains[0].alpha.clone()
        };

        Ok(Self {
            rule,
            seq,
            identifiers,
            chains,
            stages,
            terminal,
        })
    }

    /// The rule this network was compiled from.
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Registration sequence number, used for firing-order tie-breaks.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Tuple types this rule joins, in join order.
    #[must_use]
    pub fn identifiers(&self) -> &[Arc<str>] {
        &self.identifiers
    }

    /// Name of the terminal table; a row inserted there is one completed
    /// match.
    #[must_use]
    pub fn terminal(&self) -> &Arc<str> {
        &self.terminal
    }

    /// Names of every table owned by this rule (alphas then betas).
    #[must_use]
    pub fn table_names(&self) -> Vec<Arc<str>> {
        self.chains
            .iter()
            .map(|c| c.alpha.clone())
            .chain(self.stages.iter().map(|s| s.out.clone()))
            .collect()
    }
}

fn position_of(identifiers: &[Arc<str>], id: &Arc<str>, rule: &Rule) -> Result<usize> {
    identifiers
        .iter()
        .position(|i| i == id)
        .ok_or_else(|| {
            ErrorKind::InvalidRule {
                rule: rule.name().to_string(),
                reason: format!("condition references unknown identifier {id}"),
            }
            .into()
        })
}
