use crate::query::types::{Kind, Node};

/// Rewrite a query into disjunctive normal form.
///
/// `nodes` is read as an implicit conjunction (the shape `parse` returns).
/// Each returned node is one disjunct: a single leaf or an `and` over
/// leaves. The union of the disjuncts is equivalent to the input.
///
/// Disjuncts are ordered by a left-to-right, depth-first walk of the input:
/// for `(a or b) and (c or d)` the result is `a c`, `a d`, `b c`, `b d`.
/// Negation stays on the leaves. The parser never negates an operator, so
/// De Morgan rewriting is never needed.
///
/// The number of disjuncts is the product of the `or` widths met along
/// nested `and`s and grows exponentially with mixed nesting depth. No cap
/// is applied; callers that accept untrusted input should bound query size
/// before compiling.
pub fn dnf(nodes: &[Node]) -> Vec<Node> {
    distribute(vec![Vec::new()], nodes)
        .into_iter()
        .filter_map(Node::and)
        .collect()
}

/// Append `nodes` to every prefix, multiplying prefixes out at each `or`.
fn distribute(mut prefixes: Vec<Vec<Node>>, nodes: &[Node]) -> Vec<Vec<Node>> {
    for node in nodes {
        match node {
            Node::Operator(op) if op.kind == Kind::And => {
                prefixes = distribute(prefixes, &op.operands);
            }
            Node::Operator(op) => {
                let alternatives: Vec<Vec<Node>> = op
                    .operands
                    .iter()
                    .flat_map(|operand| distribute(vec![Vec::new()], std::slice::from_ref(operand)))
                    .collect();

                let mut expanded = Vec::with_capacity(prefixes.len() * alternatives.len());
                for prefix in &prefixes {
                    for alternative in &alternatives {
                        let mut conjunction = prefix.clone();
                        conjunction.extend(alternative.iter().cloned());
                        expanded.push(conjunction);
                    }
                }
                prefixes = expanded;
            }
            leaf => prefixes.iter_mut().for_each(|prefix| prefix.push(leaf.clone())),
        }
    }
    prefixes
}
