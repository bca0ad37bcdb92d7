// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::PlayerId;
use serde_json::json;

#[test]
fn build_returns_none_for_an_unregistered_command_type() {
    let registry = CommandFactoryRegistry::new();
    assert!(registry.build("navigate", PlayerId::new(7), &json!({})).is_none());
}

#[test]
fn build_dispatches_to_the_registered_factory() {
    let mut registry = CommandFactoryRegistry::new();
    registry.register("navigate", Box::new(FakeCommandFactory::new()));

    let config = json!({"destination": "X1-AU21"});
    let command = registry.build("navigate", PlayerId::new(7), &config).unwrap().unwrap();
    let recovered = command.downcast::<serde_json::Value>().unwrap();
    assert_eq!(recovered, config);
}

#[test]
fn build_surfaces_a_rejected_config_as_invalid_config() {
    let mut registry = CommandFactoryRegistry::new();
    registry.register("navigate", Box::new(FailingCommandFactory));

    let err = registry.build("navigate", PlayerId::new(7), &json!({})).unwrap().unwrap_err();
    assert!(matches!(err, FactoryError::InvalidConfig(_)));
}

#[test]
fn contains_reflects_registered_command_types() {
    let mut registry = CommandFactoryRegistry::new();
    assert!(!registry.contains("navigate"));
    registry.register("navigate", Box::new(FakeCommandFactory::new()));
    assert!(registry.contains("navigate"));
}
