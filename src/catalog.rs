//! Question Catalog
//!
//! Embedded practice questions and the sample dataset they run against.
//!
//! Every question's tables live side by side in one dataset, so table names
//! are unique across the catalog. `install` loads that dataset into an engine
//! instance and runs once per pool instance at startup.

use crate::engine::{EngineConnection, EngineError, EngineInstance, ResultSet, NULL_TEXT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A sample table: typed columns plus rows of text values (`NULL` for null).
#[derive(Debug, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
    pub rows: &'static [&'static [&'static str]],
}

#[derive(Debug, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
    pub category: &'static str,
    pub tags: &'static [&'static str],
    pub hints: &'static [&'static str],
    pub starter_code: &'static str,
    #[serde(skip)]
    pub solution: &'static str,
    pub tables: &'static [TableDef],
    pub expected_columns: &'static [&'static str],
    pub expected_rows: &'static [&'static [&'static str]],
}

impl Question {
    /// Expected answer as a result set.
    pub fn expected(&self) -> ResultSet {
        ResultSet::from_positional(
            self.expected_columns.iter().copied(),
            self.expected_rows.iter().map(|row| row.iter().copied()),
        )
    }

    pub fn summary(&self) -> QuestionSummary {
        QuestionSummary {
            id: self.id,
            slug: self.slug,
            title: self.title,
            difficulty: self.difficulty,
            category: self.category,
            tags: self.tags,
        }
    }
}

/// Listing view of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSummary {
    pub id: &'static str,
    pub slug: &'static str,
    pub title: &'static str,
    pub difficulty: Difficulty,
    pub category: &'static str,
    pub tags: &'static [&'static str],
}

/// Page size when a listing names no limit
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Listing filter. String fields match case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionFilter {
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

impl QuestionFilter {
    fn matches(&self, question: &Question) -> bool {
        let eq = |want: &Option<String>, have: &str| {
            want.as_deref()
                .map_or(true, |w| w.eq_ignore_ascii_case(have))
        };
        eq(&self.difficulty, question.difficulty.as_str())
            && eq(&self.category, question.category)
            && self.tag.as_deref().map_or(true, |tag| {
                question.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
            })
    }
}

static QUESTIONS: &[Question] = &[
    Question {
        id: "q1",
        slug: "second-highest-salary",
        title: "Second Highest Salary",
        description: "Given the Employee table, find the second highest salary. \
                      Name the result column SecondHighestSalary.",
        difficulty: Difficulty::Easy,
        category: "sql",
        tags: &["aggregate-functions", "subqueries"],
        hints: &[
            "Sort salaries in descending order and skip the first one",
            "Or take MAX(salary) over the salaries below the maximum",
        ],
        starter_code: "-- Write your query here\nSELECT ",
        solution: "SELECT MAX(salary) AS SecondHighestSalary FROM Employee \
                   WHERE salary < (SELECT MAX(salary) FROM Employee)",
        tables: &[TableDef {
            name: "Employee",
            columns: &[
                ("id", "INTEGER"),
                ("name", "VARCHAR"),
                ("salary", "INTEGER"),
                ("department_id", "INTEGER"),
            ],
            rows: &[
                &["1", "Alice", "100000", "1"],
                &["2", "Bob", "90000", "2"],
                &["3", "Charlie", "120000", "1"],
                &["4", "David", "85000", "2"],
            ],
        }],
        expected_columns: &["SecondHighestSalary"],
        expected_rows: &[&["100000"]],
    },
    Question {
        id: "q2",
        slug: "duplicate-emails",
        title: "Duplicate Emails",
        description: "Given the Person table, report every email that appears more than once.",
        difficulty: Difficulty::Easy,
        category: "sql",
        tags: &["group-by", "having-clause", "aggregate-functions"],
        hints: &[
            "GROUP BY email collects identical addresses",
            "HAVING COUNT(*) > 1 keeps the repeated ones",
        ],
        starter_code: "SELECT email",
        solution: "SELECT email FROM Person GROUP BY email HAVING COUNT(*) > 1",
        tables: &[TableDef {
            name: "Person",
            columns: &[("id", "INTEGER"), ("email", "VARCHAR")],
            rows: &[
                &["1", "alice@example.com"],
                &["2", "bob@example.com"],
                &["3", "alice@example.com"],
                &["4", "charlie@example.com"],
                &["5", "bob@example.com"],
            ],
        }],
        expected_columns: &["email"],
        expected_rows: &[&["alice@example.com"], &["bob@example.com"]],
    },
    Question {
        id: "q3",
        slug: "department-highest-salary",
        title: "Department Highest Salary",
        description: "Find the staff members who earn the highest salary in their department. \
                      Return department, employee and salary.",
        difficulty: Difficulty::Medium,
        category: "sql",
        tags: &["joins", "group-by", "subqueries"],
        hints: &[
            "Find MAX(salary) per department in a subquery",
            "JOIN Department to get the department name",
        ],
        starter_code: "SELECT ",
        solution: "SELECT d.name AS department, s.name AS employee, s.salary AS salary \
                   FROM Staff s JOIN Department d ON s.department_id = d.id \
                   WHERE s.salary = (SELECT MAX(salary) FROM Staff \
                                     WHERE department_id = s.department_id)",
        tables: &[
            TableDef {
                name: "Staff",
                columns: &[
                    ("id", "INTEGER"),
                    ("name", "VARCHAR"),
                    ("salary", "INTEGER"),
                    ("department_id", "INTEGER"),
                ],
                rows: &[
                    &["1", "Alice", "90000", "1"],
                    &["2", "Bob", "85000", "2"],
                    &["3", "Charlie", "95000", "1"],
                ],
            },
            TableDef {
                name: "Department",
                columns: &[("id", "INTEGER"), ("name", "VARCHAR")],
                rows: &[&["1", "Engineering"], &["2", "Sales"]],
            },
        ],
        expected_columns: &["department", "employee", "salary"],
        expected_rows: &[
            &["Engineering", "Charlie", "95000"],
            &["Sales", "Bob", "85000"],
        ],
    },
    Question {
        id: "q4",
        slug: "customers-who-never-order",
        title: "Customers Who Never Order",
        description: "List the names of customers with no rows in Orders. \
                      Name the result column Customers.",
        difficulty: Difficulty::Easy,
        category: "sql",
        tags: &["subqueries", "joins"],
        hints: &[
            "NOT IN against the customer ids found in Orders",
            "Or LEFT JOIN Orders and keep rows where the order side is NULL",
        ],
        starter_code: "SELECT ",
        solution: "SELECT name AS Customers FROM Customers \
                   WHERE id NOT IN (SELECT customer_id FROM Orders)",
        tables: &[
            TableDef {
                name: "Customers",
                columns: &[("id", "INTEGER"), ("name", "VARCHAR")],
                rows: &[&["1", "Joe"], &["2", "Henry"], &["3", "Sam"], &["4", "Max"]],
            },
            TableDef {
                name: "Orders",
                columns: &[("id", "INTEGER"), ("customer_id", "INTEGER")],
                rows: &[&["1", "3"], &["2", "1"]],
            },
        ],
        expected_columns: &["Customers"],
        expected_rows: &[&["Henry"], &["Max"]],
    },
    Question {
        id: "q5",
        slug: "rank-scores",
        title: "Rank Scores",
        description: "Rank the scores from highest to lowest. Ties share a rank and the next \
                      rank follows without gaps. Return score and score_rank.",
        difficulty: Difficulty::Medium,
        category: "sql",
        tags: &["window-functions", "dense-rank"],
        hints: &[
            "DENSE_RANK() gives consecutive ranks (1, 2, 2, 3)",
            "RANK() would leave gaps (1, 2, 2, 4)",
        ],
        starter_code: "SELECT ",
        solution: "SELECT score, DENSE_RANK() OVER (ORDER BY score DESC) AS score_rank \
                   FROM Scores ORDER BY score DESC",
        tables: &[TableDef {
            name: "Scores",
            columns: &[("id", "INTEGER"), ("score", "INTEGER")],
            rows: &[&["1", "95"], &["2", "85"], &["3", "95"], &["4", "75"]],
        }],
        expected_columns: &["score", "score_rank"],
        expected_rows: &[&["95", "1"], &["95", "1"], &["85", "2"], &["75", "3"]],
    },
    Question {
        id: "q6",
        slug: "consecutive-numbers",
        title: "Consecutive Numbers",
        description: "Find every number that appears at least three times in a row in Logs. \
                      Name the result column consecutive_numbers.",
        difficulty: Difficulty::Hard,
        category: "sql",
        tags: &["joins", "self-join"],
        hints: &[
            "Join Logs to itself twice, on id + 1 and id + 2",
            "All three rows must carry the same num",
        ],
        starter_code: "SELECT ",
        solution: "SELECT DISTINCT l1.num AS consecutive_numbers FROM Logs l1 \
                   JOIN Logs l2 ON l2.id = l1.id + 1 AND l2.num = l1.num \
                   JOIN Logs l3 ON l3.id = l1.id + 2 AND l3.num = l1.num",
        tables: &[TableDef {
            name: "Logs",
            columns: &[("id", "INTEGER"), ("num", "INTEGER")],
            rows: &[
                &["1", "1"],
                &["2", "1"],
                &["3", "1"],
                &["4", "2"],
                &["5", "1"],
                &["6", "2"],
                &["7", "2"],
            ],
        }],
        expected_columns: &["consecutive_numbers"],
        expected_rows: &[&["1"]],
    },
];

pub fn all() -> &'static [Question] {
    QUESTIONS
}

pub fn find_by_id(id: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.id == id)
}

pub fn find_by_slug(slug: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.slug == slug)
}

pub fn list(filter: &QuestionFilter) -> Vec<QuestionSummary> {
    QUESTIONS
        .iter()
        .filter(|q| filter.matches(q))
        .skip(filter.skip)
        .take(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .map(Question::summary)
        .collect()
}

/// Create and populate every catalog table on `instance`.
///
/// Tables that already hold rows are left untouched, so re-running against a
/// file-backed instance is harmless.
pub fn install(instance: &dyn EngineInstance) -> Result<(), EngineError> {
    let mut conn = instance.open_setup_connection()?;
    let mut seen = HashSet::new();
    for table in QUESTIONS.iter().flat_map(|q| q.tables.iter()) {
        if seen.insert(table.name) {
            install_table(conn.as_mut(), table)?;
        }
    }
    Ok(())
}

fn install_table(conn: &mut dyn EngineConnection, table: &TableDef) -> Result<(), EngineError> {
    let columns = table
        .columns
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect::<Vec<_>>()
        .join(", ");
    conn.run(&format!("CREATE TABLE IF NOT EXISTS {} ({columns})", table.name))?;

    let existing = conn.run(&format!("SELECT COUNT(*) AS n FROM {}", table.name))?;
    let populated = existing
        .rows
        .first()
        .and_then(|row| row.get("n"))
        .is_some_and(|n| n != "0");
    if populated || table.rows.is_empty() {
        return Ok(());
    }

    let names = table
        .columns
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");
    let values = table
        .rows
        .iter()
        .map(|row| {
            let literals = row
                .iter()
                .zip(table.columns.iter())
                .map(|(value, (_, ty))| sql_literal(value, ty))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({literals})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    conn.run(&format!("INSERT INTO {} ({names}) VALUES {values}", table.name))?;

    tracing::debug!(table = table.name, rows = table.rows.len(), "catalog_table_loaded");
    Ok(())
}

fn sql_literal(value: &str, ty: &str) -> String {
    if value == NULL_TEXT {
        return "NULL".to_string();
    }
    let numeric = matches!(ty, "INTEGER" | "BIGINT" | "REAL" | "DOUBLE");
    if numeric && value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
