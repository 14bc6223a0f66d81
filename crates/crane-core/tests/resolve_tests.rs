use crane_core::prelude::*;
use crane_core::{ConfigurationResolver, KeyValueContainer};
use crane_test_utils::*;
use proptest::prelude::*;
use std::sync::Arc;

fn ring(n: usize) -> DescriptorSet {
    (0..n).fold(DescriptorSet::new(), |set, i| {
        set.with_type(
            TypeDescriptor::new(format!("T{i}"))
                .disassemble("next", DisassembleDescriptor::new(format!("T{}", (i + 1) % n))),
        )
    })
}

proptest! {
    #[test]
    fn prop_cycle_resolves_to_one_configuration_per_type(n in 1..12usize, start in 0..12usize) {
        let start = start % n;
        let resolver = ConfigurationResolver::new(Arc::new(ring(n)), Arc::new(ContainerRegistry::new()));

        let plan = resolver.resolve(&TypeName::new(format!("T{start}"))).unwrap();

        prop_assert_eq!(plan.len(), n);
        for config in plan.iter() {
            let next = config.disassemble_operations()[0].child();
            prop_assert!(plan.get(next).is_some());
        }
    }
}

#[test]
fn test_conflicting_field_surfaces_at_resolve() {
    let crane = Crane::builder()
        .type_descriptor(
            TypeDescriptor::new("Member")
                .assemble("titleId", AssembleDescriptor::new("title"))
                .disassemble("titleId", DisassembleDescriptor::new("Member")),
        )
        .container("title", Arc::new(KeyValueContainer::new()))
        .unwrap()
        .build();

    let err = crane.plan("Member").unwrap_err();
    assert_eq!(err, ConfigError::conflicting("Member", "titleId"));
}

#[test]
fn test_field_declared_twice_with_both_kinds_conflicts() {
    let yaml = r"
types:
  - name: Student
    fields:
      - name: x
        assemble:
          - namespace: student
      - name: x
        disassemble: { type: Student }
";
    let descriptors = DescriptorSet::from_yaml_str(yaml).unwrap();
    let source = Arc::new(RecordingSource::new());
    let crane = crane_with_source(descriptors, &source, &["student"], CraneConfig::default());

    let err = crane.plan("Student").unwrap_err();
    assert_eq!(err, ConfigError::conflicting("Student", "x"));
    assert_eq!(source.call_count(), 0);
}

#[test]
fn test_duplicate_namespace_surfaces_at_registration() {
    let err = Crane::builder()
        .container("title", Arc::new(KeyValueContainer::new()))
        .unwrap()
        .container("title", Arc::new(KeyValueContainer::new()))
        .unwrap_err();

    assert_eq!(err, ConfigError::duplicate_namespace("title"));
}

#[test]
fn test_unknown_type_and_template_surface_at_resolve() {
    let source = Arc::new(RecordingSource::new());
    let nested = crane_with_source(
        DescriptorSet::new().with_type(
            TypeDescriptor::new("Classroom").disassemble("teachers", DisassembleDescriptor::new("Member")),
        ),
        &source,
        &[],
        CraneConfig::default(),
    );
    assert_eq!(nested.plan("Classroom").unwrap_err(), ConfigError::UnknownType("Member".into()));

    let templated = crane_with_source(
        DescriptorSet::new().with_type(
            TypeDescriptor::new("Member").assemble("titleId", AssembleDescriptor::new("title").template("missing")),
        ),
        &source,
        &["title"],
        CraneConfig::default(),
    );
    assert!(matches!(
        templated.plan("Member"),
        Err(ConfigError::UnknownTemplate { .. })
    ));
}

#[test]
fn test_failed_resolution_is_not_cached() {
    let source = Arc::new(RecordingSource::new());
    let crane = crane_with_source(
        DescriptorSet::new().with_type(student_descriptor()),
        &source,
        &[],
        CraneConfig::default(),
    );

    assert!(crane.plan("Student").is_err());
    assert!(crane.plan("Student").is_err());
}

#[test]
fn test_yaml_descriptors_drive_enrichment() {
    let yaml = r"
types:
  - name: Classroom
    fields:
      - name: teachers
        disassemble: { type: Member }
  - name: Member
    fields:
      - name: titleId
        assemble:
          - namespace: title
            prop_templates: [title_name]
templates:
  title_name:
    - { source: name, target: title }
";
    let descriptors = DescriptorSet::from_yaml_str(yaml).unwrap();
    let source = Arc::new(title_source());
    let crane = crane_with_source(descriptors, &source, &["title"], CraneConfig::default());
    let teacher = member("t", 2);

    crane.enrich(&[classroom(vec![teacher.clone()], Vec::new())], "Classroom").unwrap();

    assert_eq!(teacher.get("title"), Some(Value::from("Lecturer")));
}

#[test]
fn test_toml_config_enables_parallel_mode() {
    let config = CraneConfig::from_toml_str("parallel = true\nplan_cache_capacity = 4").unwrap();
    let crane = Crane::builder().config(config).build();
    assert!(crane.config().parallel);
    assert_eq!(crane.config().plan_cache_capacity, 4);
}
