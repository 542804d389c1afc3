//! # Test Node Tree
//!
//! A [`TestNode`] is one test case or one test suite produced by the execution
//! harness. Suites own their children outright, so a tree can never contain a
//! shared node or a back reference.
//!
//! Each node carries four counters ([`TestCounts`]): required tests passed and
//! failed, extra-credit tests passed and failed. Counters are derived data. They
//! are only ever written by [`TestNode::aggregate`], which recomputes them
//! bottom-up:
//!
//! - a leaf contributes exactly one to one bucket, chosen by its `passed` flag and
//!   by whether it carries an extra-credit category tag;
//! - a suite holds the sum of its children and contributes nothing of its own;
//! - a suite with no children holds all zeros.
//!
//! Harnesses that report flat records (id + parent id) go through
//! [`TestNode::from_flat`], which is where cycles and dangling parents are caught.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Add, AddAssign};

use crate::error::{GraderError, GraderResult};

/// Aggregated outcome counters of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCounts {
    #[serde(rename = "numTestsPassed")]
    pub tests_passed: u32,
    #[serde(rename = "numTestsFailed")]
    pub tests_failed: u32,
    #[serde(rename = "numExtraCreditPassed")]
    pub extra_credit_passed: u32,
    #[serde(rename = "numExtraCreditFailed")]
    pub extra_credit_failed: u32,
}

impl TestCounts {
    /// The contribution of a single leaf.
    pub fn leaf(passed: bool, extra_credit: bool) -> Self {
        let mut counts = TestCounts::default();
        match (extra_credit, passed) {
            (false, true) => counts.tests_passed = 1,
            (false, false) => counts.tests_failed = 1,
            (true, true) => counts.extra_credit_passed = 1,
            (true, false) => counts.extra_credit_failed = 1,
        }
        counts
    }

    /// Required tests run (passed + failed).
    pub fn total_tests(&self) -> u32 {
        self.tests_passed + self.tests_failed
    }

    pub fn total_extra_credit(&self) -> u32 {
        self.extra_credit_passed + self.extra_credit_failed
    }
}

impl Add for TestCounts {
    type Output = TestCounts;

    fn add(self, rhs: TestCounts) -> TestCounts {
        TestCounts {
            tests_passed: self.tests_passed + rhs.tests_passed,
            tests_failed: self.tests_failed + rhs.tests_failed,
            extra_credit_passed: self.extra_credit_passed + rhs.extra_credit_passed,
            extra_credit_failed: self.extra_credit_failed + rhs.extra_credit_failed,
        }
    }
}

impl AddAssign for TestCounts {
    fn add_assign(&mut self, rhs: TestCounts) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TestCounts {
    fn sum<I: Iterator<Item = TestCounts>>(iter: I) -> Self {
        iter.fold(TestCounts::default(), Add::add)
    }
}

/// One test or test suite outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNode {
    #[serde(rename = "testName")]
    pub name: String,
    #[serde(default)]
    pub passed: bool,
    /// Extra-credit category this node belongs to; empty when it is a required test.
    #[serde(default)]
    pub ec_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Marks a container node even when it has no children.
    #[serde(default)]
    suite: bool,
    #[serde(default)]
    children: Vec<TestNode>,
    #[serde(flatten)]
    counts: TestCounts,
}

impl TestNode {
    /// A leaf test that passed.
    pub fn passing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            ec_category: String::new(),
            error_message: None,
            suite: false,
            children: Vec::new(),
            counts: TestCounts::default(),
        }
    }

    /// A leaf test that failed with `message`.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            error_message: Some(message.into()),
            ..Self::passing(name)
        }
    }

    /// A suite owning `children`, in declaration order.
    pub fn suite(name: impl Into<String>, children: Vec<TestNode>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            ec_category: String::new(),
            error_message: None,
            suite: true,
            children,
            counts: TestCounts::default(),
        }
    }

    /// Tags this node with an extra-credit category. Only tagged leaves count as extra credit.
    pub fn with_ec_category(mut self, category: impl Into<String>) -> Self {
        self.ec_category = category.into();
        self
    }

    pub fn is_leaf(&self) -> bool {
        !self.suite && self.children.is_empty()
    }

    pub fn is_extra_credit(&self) -> bool {
        !self.ec_category.is_empty()
    }

    pub fn children(&self) -> &[TestNode] {
        &self.children
    }

    /// Counters as of the last [`TestNode::aggregate`] call.
    pub fn counts(&self) -> TestCounts {
        self.counts
    }

    /// Recomputes every counter in the tree bottom-up and returns the root's.
    ///
    /// Fails with [`GraderError::Structural`] when the tree is deeper than
    /// `max_depth` levels or a suite has two children with the same name. On
    /// failure the counters of the partially visited tree are unspecified and the
    /// tree must not be scored.
    pub fn aggregate(&mut self, max_depth: usize) -> GraderResult<TestCounts> {
        let mut path = Vec::new();
        self.aggregate_at(0, max_depth, &mut path)
    }

    fn aggregate_at(
        &mut self,
        depth: usize,
        max_depth: usize,
        path: &mut Vec<String>,
    ) -> GraderResult<TestCounts> {
        path.push(self.name.clone());
        if depth >= max_depth {
            return Err(GraderError::Structural(format!(
                "test tree exceeds {max_depth} levels at '{}'",
                path.join(" > ")
            )));
        }

        let counts = if self.is_leaf() {
            TestCounts::leaf(self.passed, self.is_extra_credit())
        } else {
            {
                let mut seen = HashSet::with_capacity(self.children.len());
                if let Some(dup) = self.children.iter().find(|c| !seen.insert(c.name.as_str())) {
                    return Err(GraderError::Structural(format!(
                        "duplicate test name '{}' under '{}'",
                        dup.name,
                        path.join(" > ")
                    )));
                }
            }
            let mut total = TestCounts::default();
            for child in &mut self.children {
                total += child.aggregate_at(depth + 1, max_depth, path)?;
            }
            total
        };

        self.counts = counts;
        path.pop();
        Ok(counts)
    }

    /// Fraction of extra-credit tests passed per extra-credit category.
    ///
    /// The first node on each path that carries a category tag stands for the
    /// whole category; several nodes with the same tag are pooled. Categories
    /// with no extra-credit tests are omitted. Requires aggregated counters.
    pub fn extra_credit_scores(&self) -> BTreeMap<String, f64> {
        let mut pooled: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        let mut pending = vec![self];

        while let Some(node) = pending.pop() {
            if node.is_extra_credit() {
                let entry = pooled.entry(node.ec_category.clone()).or_default();
                entry.0 += node.counts.extra_credit_passed;
                entry.1 += node.counts.extra_credit_failed;
            } else {
                pending.extend(node.children.iter());
            }
        }

        pooled
            .into_iter()
            .filter(|(_, (passed, failed))| passed + failed > 0)
            .map(|(category, (passed, failed))| {
                (category, passed as f64 / (passed + failed) as f64)
            })
            .collect()
    }

    /// Assembles a tree from flat harness records.
    ///
    /// Exactly one record must have no parent. Every other record must name an
    /// existing parent, and every record must be reachable from the root. Child
    /// order follows record order. The returned tree is already aggregated.
    pub fn from_flat(records: Vec<FlatTestRecord>, max_depth: usize) -> GraderResult<TestNode> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(GraderError::Structural(format!(
                    "duplicate test record id '{}'",
                    record.id
                )));
            }
        }

        let mut root: Option<usize> = None;
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        for (i, record) in records.iter().enumerate() {
            match &record.parent {
                None => {
                    if let Some(existing) = root {
                        return Err(GraderError::Structural(format!(
                            "multiple root records: '{}' and '{}'",
                            records[existing].id, record.id
                        )));
                    }
                    root = Some(i);
                }
                Some(parent) => {
                    let &p = index.get(parent).ok_or_else(|| {
                        GraderError::Structural(format!(
                            "record '{}' names unknown parent '{parent}'",
                            record.id
                        ))
                    })?;
                    children_of[p].push(i);
                }
            }
        }
        let root = root.ok_or_else(|| {
            GraderError::Structural("no root record (every record has a parent)".to_string())
        })?;

        // With one parent per record, anything the root cannot reach sits on a cycle.
        let mut reached = vec![false; records.len()];
        let mut pending = vec![root];
        while let Some(i) = pending.pop() {
            reached[i] = true;
            pending.extend(children_of[i].iter().copied());
        }
        if let Some(orphan) = reached.iter().position(|r| !r) {
            return Err(GraderError::Structural(format!(
                "cycle in test records involving '{}'",
                records[orphan].id
            )));
        }

        let mut slots: Vec<Option<FlatTestRecord>> = records.into_iter().map(Some).collect();
        let mut tree = build_node(root, &mut slots, &children_of, 0, max_depth)?;
        tree.aggregate(max_depth)?;
        Ok(tree)
    }
}

fn build_node(
    i: usize,
    slots: &mut [Option<FlatTestRecord>],
    children_of: &[Vec<usize>],
    depth: usize,
    max_depth: usize,
) -> GraderResult<TestNode> {
    let record = slots[i]
        .take()
        .ok_or_else(|| GraderError::Structural(format!("test record #{i} visited twice")))?;
    if depth >= max_depth {
        return Err(GraderError::Structural(format!(
            "test tree exceeds {max_depth} levels at record '{}'",
            record.id
        )));
    }

    let children = children_of[i]
        .iter()
        .map(|&c| build_node(c, slots, children_of, depth + 1, max_depth))
        .collect::<GraderResult<Vec<_>>>()?;

    Ok(TestNode {
        name: record.test_name,
        passed: record.passed,
        ec_category: record.ec_category,
        error_message: record.error_message,
        suite: record.suite || !children.is_empty(),
        children,
        counts: TestCounts::default(),
    })
}

/// One node as reported by a flat harness reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTestRecord {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub test_name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub ec_category: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub suite: bool,
}
