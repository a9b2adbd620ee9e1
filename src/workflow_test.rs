//! # Workflow Test Suite
//!
//! Tests for [`Workflow`](crate::Workflow) and its build scope.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Naming**: identifier rules for workflow and node names
//! - **Build Scope**: recorded errors and warnings, atomic inserts, fresh and resumed builds
//! - **Validation**: empty workflows, dead ends and build errors
//! - **Configuration**: prepare errors and reset between runs
//! - **Running**: blocking and async runs, refusal of invalid or unprepared workflows

use crate::configuration::{ConfigEntry, Configuration};
use crate::error::{BuildError, BuildWarning, ConfigurationError, ExecutionError, WorkflowError};
use crate::execution::TokioExecutor;
use crate::io::{SequenceSink, SequenceSource};
use crate::operators::{Expression, Filter, Union};
use crate::workflow::{Sources, Workflow, is_valid_name};
use crate::{Value, row};

fn linear() -> Workflow {
  let mut w = Workflow::new("linear").unwrap();
  let mut build = w.start_build();
  build.add_source("src").unwrap();
  build
    .add_transformation("keep", Filter::new(|r| r[0] > Value::Int(0)), "src", &[])
    .unwrap();
  build.add_target("tgt", Some("keep")).unwrap();
  build.close();
  w
}

fn config(sink: &SequenceSink) -> Configuration {
  let mut config = Configuration::new();
  config.add_configuration(
    "src",
    ConfigEntry::new().with_source(SequenceSource::new(vec![row![0], row![1], row![-1]])),
  );
  config.add_configuration("tgt", ConfigEntry::new().with_target(sink.clone()));
  config
}

#[test]
fn test_names_are_identifiers() {
  assert!(is_valid_name("_a1"));
  assert!(is_valid_name("Workflow_2"));
  assert!(!is_valid_name("1abc"));
  assert!(!is_valid_name("with space"));
  assert!(!is_valid_name(""));
  assert_eq!(
    Workflow::new("bad-name").unwrap_err(),
    BuildError::InvalidName("bad-name".to_string())
  );
}

#[test]
fn test_empty_workflow_is_invalid() {
  let mut w = Workflow::new("empty").unwrap();
  assert!(!w.is_valid());
  assert_eq!(
    w.validate(false),
    Err(BuildError::EmptyWorkflow("empty".to_string()))
  );
  assert_eq!(
    w.get_all_errors(),
    "error: No transformation defined, workflow empty is empty\n"
  );
}

#[test]
fn test_lone_source_is_unconnected_to_target() {
  let mut w = Workflow::new("lone").unwrap();
  w.start_build().add_source("src1").unwrap();
  assert!(!w.is_valid());
  assert_eq!(
    w.last_error().map(ToString::to_string).as_deref(),
    Some("Transformation src1 unconnected to a target")
  );
}

#[test]
fn test_builder_records_errors_and_warnings() {
  let mut w = linear();
  {
    let mut build = w.resume_build();
    assert_eq!(
      build.add_source("not valid"),
      Err(BuildError::InvalidName("not valid".to_string()))
    );
    assert_eq!(
      build.add_target("tgt", None),
      Err(BuildError::NodeAlreadyExists("tgt".to_string()))
    );
    assert_eq!(
      build.connect("nowhere", &["tgt"]),
      Err(BuildError::NodeNotFound("nowhere".to_string()))
    );
    build.add_source("src2").unwrap();
    build.connect("src2", &["keep"]).unwrap();
  }

  assert_eq!(w.build_errors().len(), 3);
  assert_eq!(
    w.warnings(),
    &[BuildWarning::ParentReset {
      node: "keep".to_string(),
      previous: "src".to_string(),
    }]
  );
  assert!(w.get_all_warnings().starts_with("warning: Parent node reset"));
  assert!(!w.is_valid());
  assert_eq!(
    w.validation_errors(),
    &[BuildError::UnconnectedToTarget("src".to_string())]
  );
}

#[test]
fn test_build_errors_make_the_workflow_invalid() {
  let mut w = Workflow::new("broken").unwrap();
  {
    let mut build = w.start_build();
    build.add_source("a").unwrap();
    assert_eq!(
      build.add_source("a"),
      Err(BuildError::NodeAlreadyExists("a".to_string()))
    );
    assert_eq!(
      build.add_target("t2", Some("missing")),
      Err(BuildError::NodeNotFound("missing".to_string()))
    );
    build.add_target("t", Some("a")).unwrap();
  }

  assert!(w.validation_errors().is_empty());
  assert!(!w.is_valid());
  assert_eq!(
    w.validate(false),
    Err(BuildError::NodeNotFound("missing".to_string()))
  );
  assert_eq!(
    w.last_error(),
    Some(&BuildError::NodeNotFound("missing".to_string()))
  );
  assert!(matches!(
    w.run(&mut TokioExecutor::new()),
    Err(WorkflowError::Invalid { .. })
  ));

  w.start_build().add_source("a").unwrap();
  assert!(w.build_errors().is_empty());
  assert!(!w.is_valid());
  assert_eq!(
    w.validation_errors(),
    &[BuildError::UnconnectedToTarget("a".to_string())]
  );
}

#[test]
fn test_rejected_transformation_leaves_no_partial_node() {
  let mut w = Workflow::new("partial").unwrap();
  let mut build = w.start_build();
  build.add_source("src").unwrap();
  build.add_target("out", Some("src")).unwrap();
  build
    .add_transformation("keep", Filter::default(), "src", &["out"])
    .unwrap();
  assert_eq!(build.graph().sources_of("out").unwrap(), vec!["keep"]);

  assert_eq!(
    build.add_transformation("loop", Filter::default(), "keep", &["out", "src"]),
    Err(BuildError::NotDownstreamable("src".to_string()))
  );
  assert_eq!(
    build.add_transformation("back", Union, "keep", &["keep"]),
    Err(BuildError::CycleDetected {
      producer: "back".to_string(),
      consumer: "keep".to_string(),
    })
  );
  assert_eq!(
    build.add_transformation("twice", Filter::default(), "src", &["u", "u"]),
    Err(BuildError::NodeNotFound("u".to_string()))
  );
  build.add_transformation("u", Union, None::<&str>, &[]).unwrap();
  assert_eq!(
    build.add_transformation("twice", Filter::default(), "src", &["u", "u"]),
    Err(BuildError::DuplicatedSource {
      node: "u".to_string(),
      parent: "twice".to_string(),
    })
  );

  let graph = build.graph();
  assert!(!graph.contains("loop"));
  assert!(!graph.contains("back"));
  assert!(!graph.contains("twice"));
  assert_eq!(graph.sources_of("out").unwrap(), vec!["keep"]);
  assert_eq!(graph.targets_of("keep").unwrap(), vec!["out"]);
  assert!(graph.sources_of("u").unwrap().is_empty());
}

#[test]
fn test_start_build_discards_previous_graph() {
  let mut w = linear();
  assert!(w.is_valid());
  assert_eq!(w.get_all_errors(), "No error.");
  assert_eq!(w.get_all_warnings(), "No warning.");

  w.start_build().close();
  assert!(w.graph().is_empty());
  assert!(!w.is_valid());
}

#[test]
fn test_sources_conversions() {
  assert_eq!(Sources::from("a"), Sources::One("a".to_string()));
  assert_eq!(Sources::from(None::<&str>), Sources::None);
  assert_eq!(
    Sources::from(["a", "b"]),
    Sources::Many(vec!["a".to_string(), "b".to_string()])
  );
}

#[test]
fn test_transformation_with_targets() {
  let mut w = Workflow::new("fan_in").unwrap();
  {
    let mut build = w.start_build();
    build.add_source("a").unwrap();
    build.add_source("b").unwrap();
    build.add_target("tgt", None).unwrap();
    build
      .add_transformation("u", Union, ["a", "b"], &["tgt"])
      .unwrap();
  }
  assert!(w.is_valid());
  assert_eq!(w.graph().sources_of("tgt").unwrap(), vec!["u"]);
  assert_eq!(w.graph().sources_of("u").unwrap(), vec!["a", "b"]);
}

#[test]
fn test_prepare_records_configuration_errors() {
  let mut w = linear();
  let mut config = Configuration::new();
  config.add_configuration("keep", ConfigEntry::new().with_option("x", 1));

  let err = w.prepare(&config).unwrap_err();
  assert!(matches!(err, WorkflowError::NotConfigured(_)));
  assert!(!w.is_configured());
  let errors = w.configuration_errors();
  assert!(errors.contains(&ConfigurationError::MissingArgument {
    node: "src".to_string(),
    argument: "source".to_string(),
  }));
  assert!(errors.contains(&ConfigurationError::MissingArgument {
    node: "tgt".to_string(),
    argument: "target".to_string(),
  }));
  assert!(errors.contains(&ConfigurationError::NotConfigurable("keep".to_string())));
}

#[test]
fn test_invalid_workflow_cannot_be_prepared_or_run() {
  let mut w = Workflow::new("lone").unwrap();
  w.start_build().add_source("src").unwrap();
  let sink = SequenceSink::new();
  assert!(matches!(
    w.prepare(&config(&sink)),
    Err(WorkflowError::Invalid { .. })
  ));
  assert!(matches!(
    w.run(&mut TokioExecutor::new()),
    Err(WorkflowError::Invalid { .. })
  ));
}

#[test]
fn test_unprepared_workflow_cannot_run() {
  let mut w = linear();
  assert!(matches!(
    w.run(&mut TokioExecutor::new()),
    Err(WorkflowError::NotConfigured(_))
  ));
}

#[test]
fn test_run_twice_and_reset() {
  let mut w = linear();
  let sink = SequenceSink::new();
  let mut config = config(&sink);
  w.prepare(&config).unwrap();

  let mut executor = TokioExecutor::new();
  let report = w.run(&mut executor).unwrap();
  assert_eq!(report.workflow, "linear");
  assert_eq!(
    report.jobs,
    vec![
      ("src".to_string(), "Source"),
      ("keep".to_string(), "Filter"),
      ("tgt".to_string(), "Target"),
    ]
  );
  assert_eq!(sink.rows(), vec![row![1]]);

  w.run(&mut executor).unwrap();
  assert_eq!(sink.rows(), vec![row![1], row![1]]);

  w.reset(&mut config);
  assert!(!w.is_configured());
  assert!(!config.contains("src"));
  assert!(matches!(
    w.run(&mut executor),
    Err(WorkflowError::NotConfigured(_))
  ));
}

#[test]
fn test_resume_build_requires_new_prepare() {
  let mut w = linear();
  let sink = SequenceSink::new();
  let config = config(&sink);
  w.prepare(&config).unwrap();

  w.resume_build()
    .add_transformation("copy", Expression::new(|r| r.clone()), None::<&str>, &[])
    .unwrap();
  assert!(!w.is_configured());
  assert!(!w.is_valid());
  assert!(matches!(
    w.run(&mut TokioExecutor::new()),
    Err(WorkflowError::Invalid { .. })
  ));
}

#[tokio::test]
async fn test_blocking_run_inside_a_runtime_is_refused() {
  let mut w = linear();
  let sink = SequenceSink::new();
  w.prepare(&config(&sink)).unwrap();

  let mut executor = TokioExecutor::new();
  assert!(matches!(
    w.run(&mut executor),
    Err(WorkflowError::Execution(ExecutionError::Runtime(_)))
  ));
  assert_eq!(executor.pending_jobs(), 0);
  assert!(sink.rows().is_empty());

  w.schedule(&mut executor).await.unwrap();
  assert_eq!(sink.rows(), vec![row![1]]);
}

#[tokio::test]
async fn test_schedule_on_current_runtime() {
  let mut w = linear();
  let sink = SequenceSink::new();
  w.prepare(&config(&sink)).unwrap();
  w.schedule(&mut TokioExecutor::new()).await.unwrap();
  assert_eq!(sink.rows(), vec![row![1]]);
}
