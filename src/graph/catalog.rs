//! Pass-through list and detail queries over the precomputed views.
//!
//! None of these touch the traversal engine. They read the aggregate tables
//! the CPG builder materializes and map rows straight into response types.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::converters::get_u32;
use crate::error::{CpgError, Result};
use crate::graph::store::GraphStore;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub file_count: u32,
    pub function_count: u32,
    pub total_loc: u32,
    pub total_complexity: u32,
    pub avg_complexity: f64,
    pub max_complexity: u32,
    pub type_count: u32,
    pub interface_count: u32,
}

/// Package node in the dependency graph, enriched from the treemap rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageGraphNode {
    pub id: String,
    pub label: String,
    pub function_count: u32,
    pub total_loc: u32,
    pub total_complexity: u32,
    pub avg_complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageGraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageGraph {
    pub nodes: Vec<PackageGraphNode>,
    pub edges: Vec<PackageGraphEdge>,
}

/// One bar of a histogram. Complexity buckets carry no percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBucket {
    pub label: String,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// Chart data for the dashboard. A histogram whose table the builder did not
/// produce is left out of the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distributions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_kinds: Option<Vec<DistributionBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_kinds: Option<Vec<DistributionBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Vec<DistributionBucket>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSummary {
    pub id: String,
    pub name: String,
    pub package: String,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    pub complexity: u32,
    pub fan_in: u32,
    pub fan_out: u32,
    pub loc: u32,
    pub num_params: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDetail {
    #[serde(flatten)]
    pub summary: FunctionSummary,
    pub signature: String,
    pub num_locals: u32,
    pub num_calls: u32,
    pub num_branches: u32,
    pub num_returns: u32,
    pub finding_count: u32,
    /// Preformatted caller list as stored by the builder.
    pub callers: String,
    pub callees: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub file: String,
    pub content: String,
    pub package: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub function_id: String,
    pub name: String,
    pub package: String,
    pub file: String,
    pub complexity: u32,
    pub loc: u32,
    pub fan_in: u32,
    pub fan_out: u32,
    pub finding_count: u32,
    pub hotspot_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub package: String,
    pub file: String,
    pub line: u32,
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Columns `list_packages` may sort by. Anything else falls back to the first.
pub const PACKAGE_SORT_COLUMNS: &[&str] = &[
    "total_complexity",
    "package",
    "function_count",
    "total_loc",
    "avg_complexity",
    "max_complexity",
    "file_count",
    "type_count",
    "interface_count",
];

/// Map a user-supplied sort key onto the allowlist.
pub fn package_sort_column(raw: Option<&str>) -> &'static str {
    raw.and_then(|s| PACKAGE_SORT_COLUMNS.iter().find(|c| **c == s))
        .copied()
        .unwrap_or(PACKAGE_SORT_COLUMNS[0])
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const FUNCTION_COLUMNS: &str = "n.id AS id, n.name AS name, COALESCE(n.package, '') AS package, \
    COALESCE(n.file, '') AS file, COALESCE(n.line, 0) AS line, \
    COALESCE(n.end_line, 0) AS end_line, \
    COALESCE(m.cyclomatic_complexity, 0) AS complexity, \
    COALESCE(m.fan_in, 0) AS fan_in, COALESCE(m.fan_out, 0) AS fan_out, \
    COALESCE(m.loc, 0) AS loc, COALESCE(m.num_params, 0) AS num_params";

const FUNCTION_DETAIL_SQL: &str = "\
SELECT function_id AS id, name, COALESCE(package, '') AS package, COALESCE(file, '') AS file,
       COALESCE(line, 0) AS line, COALESCE(end_line, 0) AS end_line,
       COALESCE(signature, '') AS signature,
       complexity, loc, fan_in, fan_out, num_params,
       num_locals, num_calls, num_branches, num_returns, finding_count,
       COALESCE(callers, '') AS callers, COALESCE(callees, '') AS callees
FROM dashboard_function_detail
WHERE function_id = ?1";

const SOURCE_SQL: &str = "\
SELECT file, content, COALESCE(package, '') AS package FROM sources WHERE file = ?1";

const OUTLINE_SQL: &str = "\
SELECT id, name, kind, COALESCE(line, 0) AS line, COALESCE(end_line, 0) AS end_line
FROM file_outline
WHERE file = ?1
ORDER BY line";

const HOTSPOTS_SQL: &str = "\
SELECT function_id, name, COALESCE(package, '') AS package, COALESCE(file, '') AS file,
       complexity, loc, fan_in, fan_out, finding_count, hotspot_score
FROM dashboard_hotspots
ORDER BY hotspot_score DESC
LIMIT ?1";

const PACKAGE_GRAPH_EDGES_SQL: &str = "\
SELECT source, target, weight FROM dashboard_package_graph
ORDER BY weight DESC, source, target";

const PACKAGE_ROLLUP_SQL: &str = "\
SELECT function_count, total_loc, total_complexity, avg_complexity
FROM dashboard_package_treemap
WHERE package = ?1";

const NODE_DISTRIBUTION_SQL: &str = "\
SELECT node_kind AS label, count, percentage
FROM dashboard_node_distribution
ORDER BY count DESC";

const EDGE_DISTRIBUTION_SQL: &str = "\
SELECT edge_kind AS label, count, percentage
FROM dashboard_edge_distribution
ORDER BY count DESC";

const COMPLEXITY_DISTRIBUTION_SQL: &str = "\
SELECT bucket AS label, function_count AS count, NULL AS percentage
FROM dashboard_complexity_distribution
ORDER BY bucket_min";

const TABLE_EXISTS_SQL: &str = "\
SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1)";

// ?2 is the substring pattern, ?3 the prefix pattern.
const GLOBAL_SEARCH_SQL: &str = "\
SELECT id, name, kind, COALESCE(package, '') AS package, COALESCE(file, '') AS file,
       COALESCE(line, 0) AS line
FROM symbol_index
WHERE name LIKE ?2
ORDER BY
  CASE WHEN name = ?1 THEN 0
       WHEN name LIKE ?3 THEN 1
       ELSE 2 END,
  name
LIMIT ?4";

fn package_functions_sql() -> String {
    format!(
        "SELECT {FUNCTION_COLUMNS} FROM nodes n \
         LEFT JOIN metrics m ON m.function_id = n.id \
         WHERE n.kind = 'function' AND n.package = ?1 \
         ORDER BY COALESCE(m.cyclomatic_complexity, 0) DESC \
         LIMIT ?2"
    )
}

// Empty ?1 / ?2 disable the name and package filters.
fn search_functions_sql() -> String {
    format!(
        "SELECT {FUNCTION_COLUMNS} FROM nodes n \
         LEFT JOIN metrics m ON m.function_id = n.id \
         WHERE n.kind = 'function' \
           AND (?1 = '' OR n.name LIKE '%' || ?1 || '%') \
           AND (?2 = '' OR n.package = ?2) \
         ORDER BY COALESCE(m.cyclomatic_complexity, 0) DESC \
         LIMIT ?3 OFFSET ?4"
    )
}

fn list_packages_sql(sort: &str) -> String {
    format!(
        "SELECT package, file_count, function_count, total_loc, total_complexity, \
         avg_complexity, max_complexity, type_count, interface_count \
         FROM dashboard_package_treemap \
         ORDER BY {sort} DESC LIMIT ?1 OFFSET ?2"
    )
}

// ---------------------------------------------------------------------------
// Row converters
// ---------------------------------------------------------------------------

fn row_to_function_summary(row: &Row<'_>) -> rusqlite::Result<FunctionSummary> {
    Ok(FunctionSummary {
        id: row.get("id")?,
        name: row.get("name")?,
        package: row.get("package")?,
        file: row.get("file")?,
        line: get_u32(row, "line")?,
        end_line: get_u32(row, "end_line")?,
        complexity: get_u32(row, "complexity")?,
        fan_in: get_u32(row, "fan_in")?,
        fan_out: get_u32(row, "fan_out")?,
        loc: get_u32(row, "loc")?,
        num_params: get_u32(row, "num_params")?,
    })
}

fn row_to_package(row: &Row<'_>) -> rusqlite::Result<PackageSummary> {
    Ok(PackageSummary {
        name: row.get("package")?,
        file_count: get_u32(row, "file_count")?,
        function_count: get_u32(row, "function_count")?,
        total_loc: get_u32(row, "total_loc")?,
        total_complexity: get_u32(row, "total_complexity")?,
        avg_complexity: row.get("avg_complexity")?,
        max_complexity: get_u32(row, "max_complexity")?,
        type_count: get_u32(row, "type_count")?,
        interface_count: get_u32(row, "interface_count")?,
    })
}

fn row_to_hotspot(row: &Row<'_>) -> rusqlite::Result<Hotspot> {
    Ok(Hotspot {
        function_id: row.get("function_id")?,
        name: row.get("name")?,
        package: row.get("package")?,
        file: row.get("file")?,
        complexity: get_u32(row, "complexity")?,
        loc: get_u32(row, "loc")?,
        fan_in: get_u32(row, "fan_in")?,
        fan_out: get_u32(row, "fan_out")?,
        finding_count: get_u32(row, "finding_count")?,
        hotspot_score: row.get("hotspot_score")?,
    })
}

fn row_to_bucket(row: &Row<'_>) -> rusqlite::Result<DistributionBucket> {
    Ok(DistributionBucket {
        label: row.get("label")?,
        count: get_u32(row, "count")?,
        percentage: row.get("percentage")?,
    })
}

fn row_to_package_edge(row: &Row<'_>) -> rusqlite::Result<PackageGraphEdge> {
    Ok(PackageGraphEdge {
        source: row.get("source")?,
        target: row.get("target")?,
        weight: get_u32(row, "weight")?,
    })
}

fn row_to_search_hit(row: &Row<'_>) -> rusqlite::Result<SearchHit> {
    Ok(SearchHit {
        id: row.get("id")?,
        name: row.get("name")?,
        kind: row.get("kind")?,
        package: row.get("package")?,
        file: row.get("file")?,
        line: get_u32(row, "line")?,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl GraphStore {
    /// Key/value statistics from `dashboard_overview`.
    pub fn overview(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key, COALESCE(value, '') FROM dashboard_overview")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map_err(Into::into)
    }

    /// Package rollups, sorted descending by an allowlisted column.
    pub fn list_packages(
        &self,
        sort: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PackageSummary>> {
        let sql = list_packages_sql(package_sort_column(sort));
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_and_then(params![limit, offset], row_to_package)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Package dependency graph: edges by weight, heaviest first, and one
    /// node per package that appears on an edge. Packages missing from the
    /// treemap keep zeroed metrics.
    pub fn package_graph(&self) -> Result<PackageGraph> {
        let mut stmt = self.conn.prepare_cached(PACKAGE_GRAPH_EDGES_SQL)?;
        let edges = stmt
            .query_and_then([], row_to_package_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let ids: BTreeSet<&str> = edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();

        let mut rollup = self.conn.prepare_cached(PACKAGE_ROLLUP_SQL)?;
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let metrics = rollup
                .query_row(params![id], |row| {
                    Ok((
                        get_u32(row, "function_count")?,
                        get_u32(row, "total_loc")?,
                        get_u32(row, "total_complexity")?,
                        row.get::<_, f64>("avg_complexity")?,
                    ))
                })
                .optional()?;
            let (function_count, total_loc, total_complexity, avg_complexity) =
                metrics.unwrap_or_default();
            nodes.push(PackageGraphNode {
                id: id.to_string(),
                label: id.to_string(),
                function_count,
                total_loc,
                total_complexity,
                avg_complexity,
            });
        }

        Ok(PackageGraph { nodes, edges })
    }

    /// Node-kind, edge-kind and complexity histograms.
    pub fn distributions(&self) -> Result<Distributions> {
        Ok(Distributions {
            node_kinds: self.histogram("dashboard_node_distribution", NODE_DISTRIBUTION_SQL)?,
            edge_kinds: self.histogram("dashboard_edge_distribution", EDGE_DISTRIBUTION_SQL)?,
            complexity: self.histogram(
                "dashboard_complexity_distribution",
                COMPLEXITY_DISTRIBUTION_SQL,
            )?,
        })
    }

    /// `None` when `table` does not exist in this database.
    fn histogram(&self, table: &str, sql: &str) -> Result<Option<Vec<DistributionBucket>>> {
        let exists: bool = self
            .conn
            .prepare_cached(TABLE_EXISTS_SQL)?
            .query_row(params![table], |row| row.get(0))?;
        if !exists {
            tracing::debug!(table, "histogram table absent");
            return Ok(None);
        }
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_and_then([], row_to_bucket)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map(Some)
            .map_err(Into::into)
    }

    /// Functions in one package, most complex first.
    pub fn package_functions(&self, package: &str, limit: u32) -> Result<Vec<FunctionSummary>> {
        let mut stmt = self.conn.prepare_cached(&package_functions_sql())?;
        let rows = stmt.query_and_then(params![package, limit], row_to_function_summary)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Function listing with optional name substring and package filters.
    pub fn search_functions(
        &self,
        search: &str,
        package: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FunctionSummary>> {
        let mut stmt = self.conn.prepare_cached(&search_functions_sql())?;
        let rows = stmt.query_and_then(
            params![search, package, limit, offset],
            row_to_function_summary,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn function_detail(&self, id: &str) -> Result<FunctionDetail> {
        let mut stmt = self.conn.prepare_cached(FUNCTION_DETAIL_SQL)?;
        let mut rows = stmt.query_and_then(params![id], |row| -> rusqlite::Result<_> {
            Ok(FunctionDetail {
                summary: row_to_function_summary(row)?,
                signature: row.get("signature")?,
                num_locals: get_u32(row, "num_locals")?,
                num_calls: get_u32(row, "num_calls")?,
                num_branches: get_u32(row, "num_branches")?,
                num_returns: get_u32(row, "num_returns")?,
                finding_count: get_u32(row, "finding_count")?,
                callers: row.get("callers")?,
                callees: row.get("callees")?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(CpgError::NotFound("function".into())),
        }
    }

    pub fn source(&self, file: &str) -> Result<SourceFile> {
        let mut stmt = self.conn.prepare_cached(SOURCE_SQL)?;
        let mut rows = stmt.query_and_then(params![file], |row| -> rusqlite::Result<_> {
            Ok(SourceFile {
                file: row.get("file")?,
                content: row.get("content")?,
                package: row.get("package")?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(CpgError::NotFound("file".into())),
        }
    }

    /// Symbols declared in `file`, by line.
    pub fn file_outline(&self, file: &str) -> Result<Vec<OutlineEntry>> {
        let mut stmt = self.conn.prepare_cached(OUTLINE_SQL)?;
        let rows = stmt.query_and_then(params![file], |row| -> rusqlite::Result<_> {
            Ok(OutlineEntry {
                id: row.get("id")?,
                name: row.get("name")?,
                kind: row.get("kind")?,
                line: get_u32(row, "line")?,
                end_line: get_u32(row, "end_line")?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn hotspots(&self, limit: u32) -> Result<Vec<Hotspot>> {
        let mut stmt = self.conn.prepare_cached(HOTSPOTS_SQL)?;
        let rows = stmt.query_and_then(params![limit], row_to_hotspot)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Symbol search ranked exact match, then prefix, then substring.
    pub fn global_search(&self, q: &str, limit: u32) -> Result<Vec<SearchHit>> {
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare_cached(GLOBAL_SEARCH_SQL)?;
        let rows = stmt.query_and_then(
            params![q, format!("%{q}%"), format!("{q}%"), limit],
            row_to_search_hit,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
