//! Built-in event definitions.

use fabric_types::{
    DefinitionError, DefinitionRegistry, EventDefinition, Right, Rights, STREAM_START_EVENT,
};

/// Known events: `(name, description, propagates to parent application,
/// default visibility)`. An empty visibility means the per-entity `*_all`
/// rights.
const BUILTIN: &[(&str, &str, bool, &[Right])] = &[
    (STREAM_START_EVENT, "stream started", false, &[]),
    ("application.create", "create application", false, &[]),
    ("application.update", "update application", false, &[Right::ApplicationInfo]),
    ("application.delete", "delete application", false, &[]),
    ("end_device.create", "create end device", true, &[]),
    ("end_device.update", "update end device", true, &[Right::ApplicationDevicesRead]),
    ("end_device.delete", "delete end device", true, &[]),
    ("gateway.create", "create gateway", false, &[]),
    ("gateway.update", "update gateway", false, &[Right::GatewayInfo]),
    ("gateway.delete", "delete gateway", false, &[]),
    ("gs.gateway.connect", "connect gateway", false, &[Right::GatewayStatusRead]),
    ("gs.gateway.disconnect", "disconnect gateway", false, &[Right::GatewayStatusRead]),
    ("gs.up.receive", "receive uplink message", false, &[Right::GatewayTrafficRead]),
    ("gs.down.send", "send downlink message", false, &[Right::GatewayTrafficRead]),
    ("ns.up.data.receive", "receive data message", true, &[Right::ApplicationTrafficRead]),
    ("ns.up.join.receive", "receive join-request", true, &[Right::ApplicationTrafficRead]),
    ("as.up.data.forward", "forward data message", true, &[Right::ApplicationTrafficRead]),
    ("as.up.join.forward", "forward join-accept message", true, &[Right::ApplicationTrafficRead]),
    ("as.down.data.receive", "receive downlink data message", true, &[Right::ApplicationTrafficRead]),
    ("organization.create", "create organization", false, &[]),
    ("user.login", "user login", false, &[]),
    ("client.create", "create OAuth client", false, &[]),
];

/// Registry holding every built-in definition.
pub fn builtin_registry() -> Result<DefinitionRegistry, DefinitionError> {
    let mut registry = DefinitionRegistry::new();
    for &(name, description, propagate, visibility) in BUILTIN {
        let mut definition = EventDefinition::new(name, description)
            .with_visibility(visibility.iter().copied().collect::<Rights>());
        if propagate {
            definition = definition.with_propagate_to_parent();
        }
        registry.define(definition)?;
    }
    Ok(registry)
}
