//! Introspection documents generated from descriptors.

use crate::descriptor::{Arg, InterfaceDescriptor};

const DOCTYPE: &str = "<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\"\n \"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n";

const STANDARD_INTERFACES: &str = r#"  <interface name="org.freedesktop.DBus.Peer">
    <method name="Ping"/>
  </interface>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg type="s" name="xml_data" direction="out"/>
    </method>
  </interface>
  <interface name="org.freedesktop.DBus.Properties">
    <method name="Get">
      <arg type="s" name="interface_name" direction="in"/>
      <arg type="s" name="property_name" direction="in"/>
      <arg type="v" name="value" direction="out"/>
    </method>
    <method name="GetAll">
      <arg type="s" name="interface_name" direction="in"/>
      <arg type="a{sv}" name="properties" direction="out"/>
    </method>
    <method name="Set">
      <arg type="s" name="interface_name" direction="in"/>
      <arg type="s" name="property_name" direction="in"/>
      <arg type="v" name="value" direction="in"/>
    </method>
    <signal name="PropertiesChanged">
      <arg type="s" name="interface_name"/>
      <arg type="a{sv}" name="changed_properties"/>
      <arg type="as" name="invalidated_properties"/>
    </signal>
  </interface>
"#;

/// Render the introspection document for one node.
///
/// Nodes that export interfaces also list the standard interfaces answered for
/// every object. `children` are bare path elements of the nodes below this one.
pub fn introspect_node(interfaces: &[&InterfaceDescriptor], children: &[String]) -> String {
    let mut xml = String::from(DOCTYPE);
    xml.push_str("<node>\n");

    if !interfaces.is_empty() {
        xml.push_str(STANDARD_INTERFACES);
    }
    for iface in interfaces {
        push_interface(&mut xml, iface);
    }
    for child in children {
        xml.push_str(&format!("  <node name=\"{child}\"/>\n"));
    }

    xml.push_str("</node>\n");
    xml
}

fn push_interface(xml: &mut String, iface: &InterfaceDescriptor) {
    xml.push_str(&format!("  <interface name=\"{}\">\n", iface.name));
    for method in iface.methods {
        if method.inputs.is_empty() && method.outputs.is_empty() {
            xml.push_str(&format!("    <method name=\"{}\"/>\n", method.name));
            continue;
        }
        xml.push_str(&format!("    <method name=\"{}\">\n", method.name));
        push_args(xml, method.inputs, Some("in"));
        push_args(xml, method.outputs, Some("out"));
        xml.push_str("    </method>\n");
    }
    for signal in iface.signals {
        xml.push_str(&format!("    <signal name=\"{}\">\n", signal.name));
        push_args(xml, signal.args, None);
        xml.push_str("    </signal>\n");
    }
    for prop in iface.properties {
        xml.push_str(&format!(
            "    <property name=\"{}\" type=\"{}\" access=\"{}\"/>\n",
            prop.name,
            prop.ty,
            prop.access.as_str()
        ));
    }
    xml.push_str("  </interface>\n");
}

fn push_args(xml: &mut String, args: &[Arg], direction: Option<&str>) {
    for arg in args {
        match direction {
            Some(dir) => xml.push_str(&format!(
                "      <arg type=\"{}\" name=\"{}\" direction=\"{dir}\"/>\n",
                arg.ty, arg.name
            )),
            None => xml.push_str(&format!(
                "      <arg type=\"{}\" name=\"{}\"/>\n",
                arg.ty, arg.name
            )),
        }
    }
}
