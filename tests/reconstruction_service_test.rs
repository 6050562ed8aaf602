//! Tests for ReconstructionService: load, reconstruct and dump on disk

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use cntree::application::services::ReconstructionService;
use cntree::application::ApplicationError;
use cntree::config::Settings;
use cntree::domain::serialization::{node_to_candidates, parse_dumped_attachment, parse_dumped_tree};
use cntree::domain::{CorrectedCountsView, DomainError, Node, PrettyInference};
use cntree::infrastructure::traits::RealFileSystem;

/// chr1 has six 100bp bins, chr2 three. Candidates sit on loci 0,2,5,6,8.
const COUNTS: &str = "\
chr,start,end,width,candidate_brkp,a,b,c
1,0,100,100,1,1.0,1.0,5.0
1,100,200,100,0,1.0,1.0,5.0
1,200,300,100,1,4.0,2.0,5.0
1,300,400,100,0,4.0,2.0,5.0
1,400,500,100,0,4.0,2.0,5.0
1,500,600,100,1,3.0,2.0,5.0
2,0,100,100,1,2.0,2.0,5.0
2,100,200,100,0,2.0,2.0,5.0
2,200,300,100,1,2.0,2.0,5.0
";

/// Candidate space: (0,1) is loci (0,2), (1,2) is (2,5), (3,4) is (6,8).
const TREE: &str = "(0,0)-(0,1)\n(0,1)-(1,2)\n(0,0)-(3,4)\n";

const ATTACHMENT: &str = "a;1_200;1_500;1;2\nb;1_0;1_200;0;1\nc;0;0;0;0\n";

fn create_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    std::fs::write(&path, content).expect("write input file");
    path
}

fn service(settings: Settings) -> ReconstructionService {
    ReconstructionService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

/// Inference directory plus counts file, returns (temp, counts path).
fn inference_dir(tree: &str, attachment: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let counts = create_file(&temp, "counts.csv", COUNTS);
    create_file(&temp, "in/inferred_tree", tree);
    create_file(&temp, "in/inferred_attachment", attachment);
    (temp, counts)
}

#[test]
fn given_inference_dir_when_running_then_matrix_and_files_written() {
    // Arrange
    let (temp, counts) = inference_dir(TREE, ATTACHMENT);
    let service = service(Settings::default());
    let output = temp.path().join("out");

    // Act
    let (matrix, dumped) = service
        .run(&counts, &temp.path().join("in"), &output)
        .unwrap();

    // Assert
    assert_eq!((matrix.locus_count(), matrix.cell_count()), (9, 3));
    let written = std::fs::read_to_string(&dumped.counts).unwrap();
    assert_eq!(
        written,
        "1;1;2\n1;1;2\n4;2;2\n4;2;2\n4;2;2\n2;2;2\n2;2;2\n2;2;2\n2;2;2\n"
    );
    let attachment = std::fs::read_to_string(&dumped.attachment).unwrap();
    assert_eq!(attachment, "a;1_200;1_500\nb;1_0;1_200\nc;(0,0);(0,0)\n");
    let tree = std::fs::read_to_string(&dumped.tree).unwrap();
    assert!(tree.contains("(0,0)-(1_0,1_200)\n"));
    assert!(tree.contains("(1_0,1_200)-(1_200,1_500)\n"));
    assert!(tree.contains("(0,0)-(2_0,2_200)\n"));
    assert!(dumped.json.exists());
}

#[test]
fn given_same_files_when_loading_twice_then_results_are_equal() {
    let (temp, counts_path) = inference_dir(TREE, ATTACHMENT);
    let service = service(Settings::default());
    let counts = service.load_counts(&counts_path).unwrap();
    let input = temp.path().join("in");

    let first = service.load(&input, &counts).unwrap();
    let second = service.load(&input, &counts).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.tree.len(), 4);
    assert_eq!(first.attachment[0], Node::new(2, 5));
    assert_eq!(first.attachment[2], Node::ROOT);
}

#[test]
fn given_dumped_files_when_parsing_back_then_nodes_and_candidates_recovered() {
    // Arrange
    let (temp, counts_path) = inference_dir(TREE, ATTACHMENT);
    let service = service(Settings::default());
    let output = temp.path().join("out");
    let counts = service.load_counts(&counts_path).unwrap();
    let inference = service.load(&temp.path().join("in"), &counts).unwrap();
    let matrix = service.reconstruct(&inference, &counts).unwrap();
    let dumped = service.dump(&output, &inference, &matrix, &counts).unwrap();

    // Act
    let tree_text = std::fs::read_to_string(&dumped.tree).unwrap();
    let attachment_text = std::fs::read_to_string(&dumped.attachment).unwrap();
    let mut edges = parse_dumped_tree(&tree_text, &counts).unwrap();
    let cells = parse_dumped_attachment(&attachment_text, &counts).unwrap();

    // Assert
    let mut expected = inference.tree.edges();
    edges.sort();
    expected.sort();
    assert_eq!(edges, expected);
    let nodes: Vec<Node> = cells.iter().map(|(_, n)| *n).collect();
    assert_eq!(nodes, inference.attachment.iter().copied().collect::<Vec<_>>());
    assert_eq!(cells[0].0, "a");
    assert_eq!(node_to_candidates(&cells[0].1, &counts), Some((1, 2)));
    assert_eq!(node_to_candidates(&Node::new(6, 8), &counts), Some((3, 4)));
}

#[test]
fn given_dumped_json_when_decoding_then_matches_labelled_inference() {
    let (temp, counts_path) = inference_dir(TREE, ATTACHMENT);
    let service = service(Settings::default());
    let counts = service.load_counts(&counts_path).unwrap();
    let inference = service.load(&temp.path().join("in"), &counts).unwrap();
    let matrix = service.reconstruct(&inference, &counts).unwrap();

    let dumped = service
        .dump(&temp.path().join("out"), &inference, &matrix, &counts)
        .unwrap();

    let json = std::fs::read_to_string(&dumped.json).unwrap();
    let decoded: PrettyInference = serde_json::from_str(&json).unwrap();
    assert_eq!(
        decoded,
        PrettyInference::new(&inference.tree, &inference.attachment, &counts)
    );
    assert_eq!(decoded.edges.len(), 3);
    assert!(json.contains("\"node\": {}"));
}

#[test]
fn given_chromosome_ends_enabled_when_running_then_synthetic_rows_not_dumped() {
    // Arrange: with ends, chr1 end is candidate 3 and chr2 starts at candidate 4
    let tree = "(0,0)-(2,3)\n";
    let attachment = "a;x;y;2;3\nb;x;y;0;0\nc;x;y;0;0\n";
    let (temp, counts) = inference_dir(tree, attachment);
    let service = service(Settings {
        add_chr_ends: true,
        ..Settings::default()
    });

    // Act
    let (matrix, _) = service
        .run(&counts, &temp.path().join("in"), &temp.path().join("out"))
        .unwrap();

    // Assert
    assert_eq!(matrix.locus_count(), 9);
    assert_eq!(matrix.get(5, 0), 3);
    assert_eq!(matrix.get(0, 0), 2);
}

#[test]
fn given_chromosome_ends_enabled_when_loading_counts_then_one_locus_per_chromosome_added() {
    let (_temp, counts_path) = inference_dir(TREE, ATTACHMENT);
    let service = service(Settings {
        add_chr_ends: true,
        ..Settings::default()
    });

    let counts = service.load_counts(&counts_path).unwrap();

    assert_eq!(counts.locus_count(), 11);
    assert!(counts.chromosome_ends_were_synthesized());
    assert_eq!(counts.bin_start(6), 600);
    assert_eq!(counts.corrected_count(6, 2), 2.0);
}

#[test]
fn given_missing_tree_when_loading_then_missing_input_error() {
    let temp = TempDir::new().unwrap();
    let counts_path = create_file(&temp, "counts.csv", COUNTS);
    let service = service(Settings::default());
    let counts = service.load_counts(&counts_path).unwrap();

    let err = service.load(temp.path(), &counts).unwrap_err();

    assert!(matches!(err, ApplicationError::MissingInput(p) if p.ends_with("inferred_tree")));
}

#[test]
fn given_attachment_to_node_outside_tree_when_loading_then_reference_error() {
    let attachment = "a;x;y;3;4\nb;x;y;0;1\nc;x;y;0;0\n";
    let (temp, counts_path) = inference_dir("(0,0)-(0,1)\n", attachment);
    let service = service(Settings::default());
    let counts = service.load_counts(&counts_path).unwrap();

    let err = service.load(&temp.path().join("in"), &counts).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::AttachmentReference { cell: 0, .. })
    ));
}

#[test]
fn given_custom_file_names_when_dumping_then_configured_names_used() {
    let (temp, counts) = inference_dir(TREE, ATTACHMENT);
    let mut settings = Settings::default();
    settings.files.counts = "cn_matrix.csv".into();
    let service = service(settings);

    let (_, dumped) = service
        .run(&counts, &temp.path().join("in"), &temp.path().join("out"))
        .unwrap();

    assert!(dumped.counts.ends_with("cn_matrix.csv"));
    assert!(dumped.counts.exists());
}

#[test]
fn given_directory_as_counts_path_when_loading_then_missing_input_error() {
    let temp = TempDir::new().unwrap();
    let service = service(Settings::default());

    let err = service.load_counts(temp.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::MissingInput(_)));
}

#[test]
fn given_event_ending_at_next_chromosome_when_dumping_and_parsing_then_node_recovered() {
    // Arrange: candidate 2 is chr1:500, candidate 3 is chr2:0 without synthetic ends
    let tree = "(0,0)-(2,3)\n";
    let attachment = "a;x;y;2;3\nb;x;y;0;0\nc;x;y;0;0\n";
    let (temp, counts_path) = inference_dir(tree, attachment);
    let service = service(Settings::default());
    let counts = service.load_counts(&counts_path).unwrap();
    let inference = service.load(&temp.path().join("in"), &counts).unwrap();
    let matrix = service.reconstruct(&inference, &counts).unwrap();

    // Act
    let dumped = service
        .dump(&temp.path().join("out"), &inference, &matrix, &counts)
        .unwrap();
    let tree_text = std::fs::read_to_string(&dumped.tree).unwrap();
    let attachment_text = std::fs::read_to_string(&dumped.attachment).unwrap();

    // Assert
    assert_eq!(tree_text, "(0,0)-(1_500,2_0)\n");
    assert!(attachment_text.starts_with("a;1_500;2_0\n"));
    let edges = parse_dumped_tree(&tree_text, &counts).unwrap();
    assert_eq!(edges, vec![(Node::ROOT, Node::new(5, 6))]);
    let cells = parse_dumped_attachment(&attachment_text, &counts).unwrap();
    assert_eq!(cells[0].1, Node::new(5, 6));
    assert_eq!(node_to_candidates(&cells[0].1, &counts), Some((2, 3)));
    assert_eq!(matrix.get(5, 0), 3);
}
