use crate::{ConfigError, ListScope, ViewSource};

#[test]
fn build_without_default_binder_fails() {
    let scope: ListScope<u32> = ListScope::new(|a, b| a == b, |a, b| a == b);
    assert!(matches!(scope.build(), Err(ConfigError::MissingBinder)));
}

#[test]
fn typed_binders_require_a_view_type_mapper() {
    let mut scope: ListScope<u32> = ListScope::new(|a, b| a == b, |a, b| a == b);
    scope.create(|| "default");
    scope.create_for(3, || "typed");
    assert!(matches!(
        scope.build(),
        Err(ConfigError::MissingViewTypeMapper)
    ));
}

#[test]
fn typed_binders_with_mapper_build() {
    let mut scope: ListScope<u32> = ListScope::new(|a, b| a == b, |a, b| a == b);
    scope.view_types(|item, _| *item % 2);
    scope.create(|| "default");
    scope.create_for(1, || "typed");
    assert!(scope.build().is_ok());
}

#[test]
fn with_eq_uses_equality_for_both_comparators() {
    let mut scope = ListScope::<u32>::with_eq();
    scope.create(|| ());
    assert!(scope.build().is_ok());
}

#[test]
fn view_source_downcast_checks_the_type() {
    let source = ViewSource::new(5u32);
    assert_eq!(*source.downcast_ref::<u32>().unwrap(), 5);
    assert!(matches!(
        source.downcast_ref::<String>(),
        Err(ConfigError::ViewTypeMismatch { .. })
    ));
    assert!(source.downcast_rc::<u32>().is_ok());
}
