//! Tests for copy-number reconstruction over hand-built trees

use ndarray::Array2;
use rstest::rstest;

use cntree::domain::counts::Locus;
use cntree::domain::{
    reconstruct, reconstruct_traced, Attachment, CorrectedCounts, CorrectedCountsView, DomainError,
    EventTree, Node,
};
use cntree::util::testing;

/// One chromosome, 100bp bins, every bin a breakpoint candidate.
fn counts_from(rows: &[[f64; 2]]) -> CorrectedCounts {
    let loci = (0..rows.len() as u64)
        .map(|i| Locus {
            chromosome: 1,
            start: i * 100,
            end: i * 100 + 100,
            width: 100,
            candidate: true,
        })
        .collect();
    let values = Array2::from_shape_fn((rows.len(), 2), |(r, c)| rows[r][c]);
    CorrectedCounts::new(loci, vec!["cell0".into(), "cell1".into()], values).unwrap()
}

/// root -> (0,2) -> (2,5)
fn chain_tree() -> EventTree {
    let mut tree = EventTree::new();
    let a = tree.insert_node(Node::new(0, 2), tree.root()).unwrap();
    tree.insert_node(Node::new(2, 5), a).unwrap();
    tree
}

fn scenario_counts() -> CorrectedCounts {
    counts_from(&[
        [10.0, 10.0],
        [10.0, 10.0],
        [20.0, 20.0],
        [20.0, 20.0],
        [20.0, 20.0],
    ])
}

#[test]
fn given_three_node_chain_when_reconstructing_then_events_resolve_their_bins() {
    // Arrange
    testing::init_test_setup();
    let counts = scenario_counts();
    let attachment = Attachment::new(vec![Node::new(2, 5), Node::new(0, 2)]);

    // Act
    let matrix = reconstruct(&chain_tree(), &attachment, &counts, 2).unwrap();

    // Assert
    assert_eq!((matrix.locus_count(), matrix.cell_count()), (5, 2));
    for bin in 2..5 {
        assert_eq!(matrix.get(bin, 0), 20, "cell0 bin {}", bin);
        assert_eq!(matrix.get(bin, 1), 2, "cell1 bin {}", bin);
    }
    for bin in 0..2 {
        assert_eq!(matrix.get(bin, 1), 10, "cell1 bin {}", bin);
        // cell0 climbs to (0,2) after its own event and inherits the ancestor level
        assert_eq!(matrix.get(bin, 0), 10, "cell0 bin {}", bin);
    }
}

#[test]
fn given_caller_attachment_when_reconstructing_then_it_is_not_mutated() {
    let counts = scenario_counts();
    let attachment = Attachment::new(vec![Node::new(2, 5), Node::new(0, 2)]);
    let before = attachment.clone();

    reconstruct(&chain_tree(), &attachment, &counts, 2).unwrap();

    assert_eq!(attachment, before);
}

#[test]
fn given_resolved_slots_when_summing_counts_then_each_node_conserves_its_share() {
    // Arrange
    let counts = counts_from(&[[4.0, 8.0], [6.0, 8.0], [3.0, 1.0], [3.0, 1.0], [3.0, 1.0]]);
    let attachment = Attachment::new(vec![Node::new(2, 5), Node::new(0, 2)]);

    // Act
    let result = reconstruct_traced(&chain_tree(), &attachment, &counts, 2).unwrap();

    // Assert
    let deep = &result.steps[0];
    assert_eq!(deep.node, Node::new(2, 5));
    assert_eq!(deep.cells, vec![0]);
    assert_eq!(deep.resolved, 3);
    assert_eq!(deep.value, Some(3));

    // cell0 (4+6) and cell1 (8+8) over four slots, 6.5 rounds to even
    let shallow = &result.steps[1];
    assert_eq!(shallow.node, Node::new(0, 2));
    assert_eq!(shallow.cells, vec![0, 1]);
    assert_eq!(shallow.resolved, 4);
    assert_eq!(shallow.value, Some(6));

    for step in &result.steps {
        let summed: f64 = step
            .cells
            .iter()
            .flat_map(|&c| step.node.loci().map(move |b| (b, c)))
            .map(|(b, c)| counts.corrected_count(b, c))
            .sum();
        let value = step.value.unwrap() as f64;
        assert!((summed - value * step.resolved as f64).abs() <= step.resolved as f64 * 0.5);
    }
}

#[test]
fn given_full_reconstruction_when_inspecting_bitmap_then_each_slot_resolved_at_most_once() {
    // Arrange
    let counts = scenario_counts();
    let attachment = Attachment::new(vec![Node::new(2, 5), Node::new(0, 2)]);

    // Act
    let result = reconstruct_traced(&chain_tree(), &attachment, &counts, 2).unwrap();

    // Assert
    let total_resolved: usize = result.steps.iter().map(|s| s.resolved).sum();
    let marked = result.resolved.iter().filter(|&&r| r).count();
    assert_eq!(total_resolved, marked);
    assert!(!result.resolved[[2, 1]]);
    assert!(result.resolved[[0, 0]]);
}

#[rstest]
#[case(0)]
#[case(2)]
#[case(5)]
fn given_cell_on_root_when_reconstructing_then_column_is_neutral(#[case] neutral_cn: i64) {
    let counts = scenario_counts();
    let attachment = Attachment::new(vec![Node::ROOT, Node::new(2, 5)]);

    let matrix = reconstruct(&chain_tree(), &attachment, &counts, neutral_cn).unwrap();

    assert!(matrix.view().column(0).iter().all(|&v| v == neutral_cn));
    assert_eq!(matrix.get(0, 1), 10);
}

#[rstest]
#[case(false, 5)]
#[case(true, 5)]
fn given_chromosome_ends_when_reconstructing_then_synthetic_rows_removed(
    #[case] add_ends: bool,
    #[case] expected_rows: usize,
) {
    // Arrange
    let mut counts = scenario_counts();
    if add_ends {
        counts.add_chromosome_ends(2.0, 150_000);
        assert_eq!(counts.locus_count(), 6);
    }
    let attachment = Attachment::new(vec![Node::new(2, 5), Node::ROOT]);

    // Act
    let result = reconstruct_traced(&chain_tree(), &attachment, &counts, 2).unwrap();

    // Assert
    assert_eq!(result.matrix.locus_count(), expected_rows);
    let expected_removed = if add_ends { vec![5] } else { Vec::new() };
    assert_eq!(result.removed_rows, expected_removed);
    assert_eq!(result.matrix.get(4, 0), 20);
}

#[test]
fn given_attachment_to_unknown_node_when_reconstructing_then_reference_error() {
    let counts = scenario_counts();
    let attachment = Attachment::new(vec![Node::new(1, 3), Node::ROOT]);

    let err = reconstruct(&chain_tree(), &attachment, &counts, 2).unwrap_err();

    assert!(matches!(err, DomainError::AttachmentReference { cell: 0, .. }));
}

#[test]
fn given_siblings_when_reconstructing_then_visited_in_insertion_order() {
    let counts = counts_from(&[[1.0, 5.0], [1.0, 5.0], [3.0, 9.0], [3.0, 9.0], [3.0, 9.0]]);
    let mut tree = EventTree::new();
    tree.insert_node(Node::new(2, 5), tree.root()).unwrap();
    tree.insert_node(Node::new(0, 2), tree.root()).unwrap();
    let attachment = Attachment::new(vec![Node::new(0, 2), Node::new(2, 5)]);

    let result = reconstruct_traced(&tree, &attachment, &counts, 2).unwrap();

    let visited: Vec<Node> = result.steps.iter().map(|s| s.node).collect();
    assert_eq!(visited, vec![Node::new(2, 5), Node::new(0, 2)]);
    assert_eq!(result.matrix.get(0, 0), 1);
    assert_eq!(result.matrix.get(2, 1), 9);
}
