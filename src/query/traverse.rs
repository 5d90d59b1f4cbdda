//! Recursive traversal query construction.
//!
//! A traversal is one `WITH RECURSIVE` fixed-point query expanding
//! outward from a single seed node, deduplicated by set-union semantics
//! (`UNION`, never `UNION ALL`). Rows carry a depth counter, so the
//! union alone cannot terminate a cycle — the same identifier would
//! re-enter at ever-growing depths. Every edge arm is therefore gated
//! on a depth bound: the caller's configured bound, or one the store
//! derives from the graph size, which never cuts a reachable row (no
//! expansion needs more rounds than there are nodes). The rendered text
//! embeds no values: the seed id binds as `?1` and the depth bound as
//! `?2`; everything else varies structurally with the configuration.

/// Configuration for a breadth-first expansion from one seed node.
///
/// Defaults: follow both directions, no bodies, unbounded depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalQuery {
    with_bodies: bool,
    inbound: bool,
    outbound: bool,
    max_depth: Option<u32>,
}

impl Default for TraversalQuery {
    fn default() -> Self {
        TraversalQuery {
            with_bodies: false,
            inbound: true,
            outbound: true,
            max_depth: None,
        }
    }
}

impl TraversalQuery {
    pub fn new() -> TraversalQuery {
        TraversalQuery::default()
    }

    /// Carry node bodies and edge payloads on result rows, with a kind
    /// tag distinguishing node rows from edge rows.
    pub fn with_bodies(mut self) -> TraversalQuery {
        self.with_bodies = true;
        self
    }

    /// Follow edges arriving at reached nodes (target → source).
    pub fn follow_inbound(mut self, enabled: bool) -> TraversalQuery {
        self.inbound = enabled;
        self
    }

    /// Follow edges leaving reached nodes (source → target).
    pub fn follow_outbound(mut self, enabled: bool) -> TraversalQuery {
        self.outbound = enabled;
        self
    }

    /// Bound the number of expansion rounds. Rows past the bound are not
    /// admitted into the fixed point; same-depth re-examination of
    /// already-reached nodes still happens within the final round.
    pub fn max_depth(mut self, depth: u32) -> TraversalQuery {
        self.max_depth = Some(depth);
        self
    }

    pub(crate) fn carries_bodies(&self) -> bool {
        self.with_bodies
    }

    pub(crate) fn depth_bound(&self) -> Option<u32> {
        self.max_depth
    }

    /// Whether any edge arm is rendered (and so whether `?2` exists).
    pub(crate) fn follows_edges(&self) -> bool {
        self.inbound || self.outbound
    }

    /// Render the recursive query.
    pub fn render(&self) -> String {
        // Each edge arm produces rows one round deeper than the row it
        // expanded from. The gate is unconditional: depth participates
        // in the union's row identity, so without it a cycle would
        // re-admit the same identifiers at ever-growing depths and the
        // recursion would never reach a fixed point.
        let gate = " WHERE walk.depth + 1 <= ?2";

        let mut arms: Vec<String> = Vec::new();
        if self.with_bodies {
            arms.push(
                "SELECT id, 'node', NULL, NULL, body, 0 FROM nodes WHERE id = ?1".to_string(),
            );
            // Re-select the node row for every id reached through an
            // edge, at the depth it was reached. Idempotent under the
            // set union.
            arms.push(
                "SELECT nodes.id, 'node', NULL, NULL, nodes.body, walk.depth \
                 FROM nodes JOIN walk ON nodes.id = walk.x"
                    .to_string(),
            );
            if self.inbound {
                arms.push(format!(
                    "SELECT edges.source, 'edge', edges.source, edges.target, \
                     edges.properties, walk.depth + 1 \
                     FROM edges JOIN walk ON edges.target = walk.x{gate}"
                ));
            }
            if self.outbound {
                arms.push(format!(
                    "SELECT edges.target, 'edge', edges.source, edges.target, \
                     edges.properties, walk.depth + 1 \
                     FROM edges JOIN walk ON edges.source = walk.x{gate}"
                ));
            }
        } else {
            arms.push("SELECT id, 0 FROM nodes WHERE id = ?1".to_string());
            if self.inbound {
                arms.push(format!(
                    "SELECT edges.source, walk.depth + 1 \
                     FROM edges JOIN walk ON edges.target = walk.x{gate}"
                ));
            }
            if self.outbound {
                arms.push(format!(
                    "SELECT edges.target, walk.depth + 1 \
                     FROM edges JOIN walk ON edges.source = walk.x{gate}"
                ));
            }
        }

        let columns = if self.with_bodies {
            "x, kind, source, target, payload, depth"
        } else {
            "x, depth"
        };

        format!(
            "WITH RECURSIVE walk({columns}) AS (\n{}\n) SELECT {columns} FROM walk",
            arms.join("\nUNION\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodiless_both_directions() {
        let sql = TraversalQuery::new().render();
        assert_eq!(
            sql,
            "WITH RECURSIVE walk(x, depth) AS (\n\
             SELECT id, 0 FROM nodes WHERE id = ?1\n\
             UNION\n\
             SELECT edges.source, walk.depth + 1 FROM edges JOIN walk ON edges.target = walk.x \
             WHERE walk.depth + 1 <= ?2\n\
             UNION\n\
             SELECT edges.target, walk.depth + 1 FROM edges JOIN walk ON edges.source = walk.x \
             WHERE walk.depth + 1 <= ?2\n\
             ) SELECT x, depth FROM walk"
        );
    }

    #[test]
    fn outbound_only_drops_the_inbound_arm() {
        let sql = TraversalQuery::new().follow_inbound(false).render();
        assert!(!sql.contains("ON edges.target = walk.x"));
        assert!(sql.contains("ON edges.source = walk.x"));
    }

    #[test]
    fn no_directions_is_just_the_seed() {
        let sql = TraversalQuery::new()
            .follow_inbound(false)
            .follow_outbound(false)
            .render();
        assert_eq!(
            sql,
            "WITH RECURSIVE walk(x, depth) AS (\n\
             SELECT id, 0 FROM nodes WHERE id = ?1\n\
             ) SELECT x, depth FROM walk"
        );
    }

    #[test]
    fn body_rows_carry_kind_and_original_endpoints() {
        let sql = TraversalQuery::new().with_bodies().render();
        // Edge arms surface the edge's own source/target verbatim in
        // both directions; only the reached id differs.
        assert!(sql.contains(
            "SELECT edges.source, 'edge', edges.source, edges.target, edges.properties"
        ));
        assert!(sql.contains(
            "SELECT edges.target, 'edge', edges.source, edges.target, edges.properties"
        ));
        assert!(sql.starts_with("WITH RECURSIVE walk(x, kind, source, target, payload, depth)"));
    }

    #[test]
    fn depth_bound_gates_every_edge_arm() {
        let sql = TraversalQuery::new().max_depth(3).render();
        assert_eq!(sql.matches("WHERE walk.depth + 1 <= ?2").count(), 2);
        // The bound is a parameter, never an embedded literal.
        assert!(!sql.contains('3'));
    }

    #[test]
    fn edge_arms_are_gated_even_without_a_configured_bound() {
        // Depth is part of each row, so ungated recursion would never
        // reach a fixed point on a cycle.
        let sql = TraversalQuery::new().with_bodies().render();
        assert_eq!(sql.matches("WHERE walk.depth + 1 <= ?2").count(), 2);
        let one_armed = TraversalQuery::new().follow_inbound(false).render();
        assert_eq!(one_armed.matches("?2").count(), 1);
    }

    #[test]
    fn seed_only_render_has_no_depth_parameter() {
        let sql = TraversalQuery::new()
            .follow_inbound(false)
            .follow_outbound(false)
            .render();
        assert!(!sql.contains("?2"));
    }

    #[test]
    fn set_union_only() {
        let sql = TraversalQuery::new().with_bodies().max_depth(2).render();
        assert!(!sql.contains("UNION ALL"));
    }
}
