use crate::SchemaError;

pub const BUS_NAME: &str = "io.starnight.dbus_test.TestServer";
pub const OBJECT_PATH: &str = "/io/starnight/dbus_test/TestObject";
pub const INTERFACE_NAME: &str = "io.starnight.dbus_test.TestInterface";

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
pub const PEER_INTERFACE: &str = "org.freedesktop.DBus.Peer";

/// Value `Title` reports until it is first written.
pub const TITLE_DEFAULT: &str = "Chat D-Bus!";

/// Error identifier for domain failures raised on `interface`.
pub fn failed_error_name(interface: &str) -> String {
    format!("{interface}.Failed")
}

/// Check `path` against the D-Bus object path grammar: `/`, or `/`-separated
/// non-empty elements of `[A-Za-z0-9_]` with no trailing slash.
pub fn validate_object_path(path: &str) -> Result<(), SchemaError> {
    let invalid = || SchemaError::InvalidObjectPath(path.to_owned());

    if path == "/" {
        return Ok(());
    }
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    for element in rest.split('/') {
        if element.is_empty()
            || !element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(invalid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_error_name_is_interface_scoped() {
        assert_eq!(
            failed_error_name(INTERFACE_NAME),
            "io.starnight.dbus_test.TestInterface.Failed"
        );
    }

    #[test]
    fn fixed_object_path_is_valid() {
        assert!(validate_object_path(OBJECT_PATH).is_ok());
        assert!(validate_object_path("/").is_ok());
    }

    #[test]
    fn malformed_object_paths_rejected() {
        for bad in ["", "io/starnight", "/io/", "//io", "/io/star-night", "/io/a.b"] {
            assert_eq!(
                validate_object_path(bad),
                Err(SchemaError::InvalidObjectPath(bad.to_owned())),
                "{bad:?} should be rejected"
            );
        }
    }
}
