use chunkeval::{
    align, annotate_text, classification_report, compile_chunks, evaluate_columns,
    evaluate_documents, select_layer, AlignmentCategory, AnnotationLayer, ConfigurationError,
    Counts, EntityChunk, EvalConfig, EvalConfigBuilder, LabelMetrics, Language, Reporter,
};
use std::collections::HashSet;
use std::fs::read_to_string;

pub trait CloseEnough {
    fn are_close(&self, other: &Self, eps: f64) -> bool;
}

// LabelMetrics only compares the label and the average in its PartialEq implementation.
impl CloseEnough for LabelMetrics {
    fn are_close(&self, other: &Self, eps: f64) -> bool {
        let are_equal = self == other;
        let precision_is_equal = f64::abs(self.precision - other.precision) < eps;
        let recall_is_equal = f64::abs(self.recall - other.recall) < eps;
        let fscore_is_equal = f64::abs(self.fscore - other.fscore) < eps;
        let counts_are_equal =
            (self.ok, self.gold, self.guess) == (other.ok, other.gold, other.guess);
        are_equal && precision_is_equal && recall_is_equal && fscore_is_equal && counts_are_equal
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn read_corpus(content: &str) -> Vec<Vec<Vec<&str>>> {
    content
        .split("\n\n")
        .map(|sentence| {
            sentence
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.split_whitespace().collect())
                .collect::<Vec<Vec<&str>>>()
        })
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

const EXPECTED_SAMPLE_REPORT: &str = "entity\tprecision\trecall\tf-measure
LOC\t0,00\t0,00\t0,00
ORG\t66,67\t100,00\t80,00
PER\t66,67\t66,67\t66,67

micro-average\t66,67\t57,14\t61,54
macro-average\t44,44\t55,56\t49,38
";

#[test]
fn sample_corpus_report() {
    init_logging();
    let content =
        read_to_string("tests/sample.conll").expect("file sample.conll not found in test directory");
    let corpus = read_corpus(&content);
    assert_eq!(corpus.len(), 3);
    let reporter = evaluate_columns(&corpus, None, &EvalConfig::default()).unwrap();
    assert_eq!(reporter.to_string(), EXPECTED_SAMPLE_REPORT);

    let actual: HashSet<LabelMetrics> = reporter.clone().into();
    let expected = LabelMetrics {
        label: String::from("ORG"),
        average: chunkeval::Average::None,
        precision: 200.0 / 3.0,
        recall: 100.0,
        fscore: 80.0,
        ok: 2,
        gold: 2,
        guess: 3,
    };
    let org = actual.get(&expected).unwrap();
    assert!(org.are_close(&expected, 1e-9));
    let mut miscounted = expected.clone();
    miscounted.guess = 2;
    assert!(!org.are_close(&miscounted, 1e-9));
}

#[test]
fn sample_corpus_fields_by_name() {
    init_logging();
    let content =
        read_to_string("tests/sample.conll").expect("file sample.conll not found in test directory");
    let corpus = read_corpus(&content);
    let header = ["token", "gold", "guess"];
    let config = EvalConfigBuilder::new()
        .reference_field("gold")
        .tagging_field("guess")
        .decimal_separator('.')
        .build();
    let reporter = evaluate_columns(&corpus, Some(&header[..]), &config).unwrap();
    assert_eq!(
        reporter.render(&config.report()),
        EXPECTED_SAMPLE_REPORT.replace(',', ".")
    );

    // Swapping the fields swaps precision and recall.
    let swapped = EvalConfigBuilder::new()
        .reference_field("guess")
        .tagging_field("gold")
        .build();
    let reporter = evaluate_columns(&corpus, Some(&header[..]), &swapped).unwrap();
    let org = reporter.get("ORG").unwrap();
    assert!((org.precision - 100.0).abs() < 1e-9);
    assert!((org.recall - 200.0 / 3.0).abs() < 1e-9);

    let unknown = EvalConfigBuilder::new().tagging_field("system").build();
    assert!(matches!(
        evaluate_columns(&corpus, Some(&header[..]), &unknown),
        Err(chunkeval::ComputationError::Configuration(
            ConfigurationError::UnresolvedField(_)
        ))
    ));
}

#[test]
fn malformed_tag_is_reported() {
    let corpus = vec![vec![vec!["Paris", "B-LOC", "LOC"]]];
    let actual = evaluate_columns(&corpus, None, &EvalConfig::default());
    assert_eq!(
        actual.unwrap_err().to_string(),
        "malformed tag \"LOC\": expected \"O\", \"B-<label>\" or \"I-<label>\""
    );
}

#[test]
fn compile_simple_column() {
    let chunks = compile_chunks(&["B-PER", "I-PER", "O", "B-LOC", "O"]).unwrap();
    let expected: HashSet<EntityChunk> = HashSet::from_iter([
        EntityChunk::from(("PER", 0, 2)),
        EntityChunk::from(("LOC", 3, 4)),
    ]);
    assert_eq!(chunks.iter().cloned().collect::<HashSet<_>>(), expected);
}

#[test]
fn type_error_scores() {
    let (alignment, reporter) = evaluate_documents(
        vec![EntityChunk::from(("PER", 0, 2))],
        vec![EntityChunk::from(("PERS", 0, 2))],
    );
    assert_eq!(alignment.len(AlignmentCategory::Type), 1);
    let per = reporter.get("PER").unwrap();
    let expected = LabelMetrics {
        label: String::from("PER"),
        average: chunkeval::Average::None,
        precision: 0.0,
        recall: 0.0,
        fscore: 0.0,
        ok: 0,
        gold: 1,
        guess: 1,
    };
    assert!(per.are_close(&expected, 1e-9));
    assert!(reporter.get("PERS").is_none());
    let micro = reporter.micro().unwrap();
    assert_eq!((micro.ok, micro.gold, micro.guess), (0, 1, 1));
}

#[test]
fn identical_documents_score_perfectly() {
    let chunks = vec![
        EntityChunk::from(("PER", 0, 10)),
        EntityChunk::from(("LOC", 20, 25)),
        EntityChunk::from(("PER", 30, 34)),
    ];
    let (alignment, reporter) = evaluate_documents(chunks.clone(), chunks);
    assert!(alignment.silence().is_empty());
    assert!(alignment.noise().is_empty());
    for metrics in reporter.iter_labels() {
        assert_eq!(
            (metrics.precision, metrics.recall, metrics.fscore),
            (100.0, 100.0, 100.0)
        );
    }
}

#[test]
fn empty_hypothesis_has_zero_recall() {
    let reference = vec![
        EntityChunk::from(("PER", 0, 10)),
        EntityChunk::from(("LOC", 20, 25)),
    ];
    let (alignment, reporter) = evaluate_documents(reference, vec![]);
    assert_eq!(alignment.silence().len(), 2);
    assert!(alignment.noise().is_empty());
    for metrics in reporter.iter_labels() {
        assert_eq!(metrics.recall, 0.0);
    }
}

#[test]
fn raw_text_to_report() {
    init_logging();
    let text = "Jean Dupont habite à Paris. Il travaille chez Airbus.\n\nMarie l'a-t-elle vu ?";
    fn gazetteer(tokens: &[&str]) -> Vec<String> {
        let mut tags = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let tag = match *token {
                "Jean" | "Marie" => "B-PER",
                "Dupont" if i > 0 && tokens[i - 1] == "Jean" => "I-PER",
                "Paris" | "Airbus" => "B-LOC",
                _ => "O",
            };
            tags.push(String::from(tag));
        }
        tags
    }
    let config = EvalConfigBuilder::new().language(Language::French).build();
    let (segmentation, hypothesis) = annotate_text(text, &config, gazetteer).unwrap();
    assert_eq!(segmentation.sentences().len(), 3);
    assert_eq!(segmentation.paragraphs().len(), 2);

    let found: Vec<(&str, &str)> = hypothesis
        .iter()
        .map(|c| (c.label(), &text[c.start()..c.end()]))
        .collect();
    assert_eq!(
        found,
        vec![
            ("PER", "Jean Dupont"),
            ("LOC", "Paris"),
            ("LOC", "Airbus"),
            ("PER", "Marie")
        ]
    );

    let position = |needle: &str| text.find(needle).unwrap();
    let reference = vec![
        EntityChunk::from(("PER", position("Jean"), position("Jean") + 11)),
        EntityChunk::from(("LOC", position("Paris"), position("Paris") + 5)),
        EntityChunk::from(("ORG", position("Airbus"), position("Airbus") + 6)),
        EntityChunk::from(("PER", position("Marie"), position("Marie") + 5)),
    ];
    let layers = vec![
        AnnotationLayer::new("NER", reference),
        AnnotationLayer::new("POS", vec![]),
    ];
    let reference = select_layer(&layers, Some("NER")).unwrap();
    assert!(select_layer(&layers, None).is_err());

    let alignment = align(reference.annotations.clone(), hypothesis);
    assert_eq!(alignment.len(AlignmentCategory::Correct), 3);
    assert_eq!(alignment.len(AlignmentCategory::Type), 1);
    let reporter: Reporter = classification_report(&Counts::from_alignment(&alignment));
    let micro = reporter.micro().unwrap();
    assert!((micro.precision - 75.0).abs() < 1e-9);
    assert!((micro.recall - 75.0).abs() < 1e-9);
    assert_eq!(reporter.get("ORG").unwrap().gold, 1);
}

#[test]
fn tagger_must_tag_every_token() {
    let config = EvalConfig::default();
    let actual = annotate_text("Une phrase.", &config, |_| vec![String::from("O")]);
    assert!(matches!(
        actual,
        Err(chunkeval::ComputationError::Configuration(
            ConfigurationError::RaggedTable { .. }
        ))
    ));
}
