//! Firewall object tools: addresses, address groups, services, service
//! groups.
//!
//! The typed `create_address_*` and `create_service_*` tools build the
//! exact table entries the appliance expects (`ipmask`, `fqdn`, `iprange`,
//! `TCP/UDP/SCTP`, `ICMP`) so an agent never has to know the raw field
//! names; generic update tools accept free-form field objects.

use serde_json::{Map, Value, json};

use fmg_api::validation::{
    validate_fqdn, validate_ipv4, validate_ipv4_cidr, validate_object_name, validate_port_range,
};
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_filter, optional_str,
    optional_string_vec, require_adom, require_object_map, require_str, success_list,
    success_message, success_with,
};

const ADDRESS: &str = "firewall/address";
const ADDRGRP: &str = "firewall/addrgrp";
const SERVICE: &str = "firewall/service/custom";
const SERVICE_GROUP: &str = "firewall/service/group";

const ADOM_DEFAULT: ParamSpec = ParamSpec {
    name: "adom",
    kind: ParamKind::String,
    description: "ADOM name (default: root)",
    required: false,
};

const ADOM_REQUIRED: ParamSpec = ParamSpec {
    name: "adom",
    kind: ParamKind::String,
    description: "ADOM name",
    required: true,
};

const NAME: ParamSpec = ParamSpec {
    name: "name",
    kind: ParamKind::String,
    description: "Object name",
    required: true,
};

const COMMENT: ParamSpec = ParamSpec {
    name: "comment",
    kind: ParamKind::String,
    description: "Comment",
    required: false,
};

const FIELDS: ParamSpec = ParamSpec {
    name: "fields",
    kind: ParamKind::StringArray,
    description: "Specific fields to return",
    required: false,
};

const FILTER: ParamSpec = ParamSpec {
    name: "filter",
    kind: ParamKind::Array,
    description: "FortiManager filter expression",
    required: false,
};

const MEMBERS: ParamSpec = ParamSpec {
    name: "members",
    kind: ParamKind::StringArray,
    description: "Member object names",
    required: true,
};

const DATA: ParamSpec = ParamSpec {
    name: "data",
    kind: ParamKind::Object,
    description: "Fields to update",
    required: true,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_addresses",
        description: "List firewall address objects in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS, FILTER],
    },
    ToolSpec {
        name: "get_address",
        description: "Get one firewall address object.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_address_subnet",
        description: "Create an ipmask address object from a CIDR subnet.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "subnet",
                kind: ParamKind::String,
                description: "IPv4 subnet in CIDR form, e.g. 10.0.0.0/24",
                required: true,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "create_address_host",
        description: "Create an address object for a single host (/32).",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "ip",
                kind: ParamKind::String,
                description: "Host IPv4 address",
                required: true,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "create_address_fqdn",
        description: "Create an FQDN address object.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "fqdn",
                kind: ParamKind::String,
                description: "Fully qualified domain name, e.g. www.example.com",
                required: true,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "create_address_range",
        description: "Create an iprange address object.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "start_ip",
                kind: ParamKind::String,
                description: "First IPv4 address of the range",
                required: true,
            },
            ParamSpec {
                name: "end_ip",
                kind: ParamKind::String,
                description: "Last IPv4 address of the range",
                required: true,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "update_address",
        description: "Update fields of an address object.",
        params: &[ADOM_REQUIRED, NAME, DATA],
    },
    ToolSpec {
        name: "delete_address",
        description: "Delete an address object.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "list_address_groups",
        description: "List firewall address groups in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS, FILTER],
    },
    ToolSpec {
        name: "get_address_group",
        description: "Get one address group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_address_group",
        description: "Create an address group from existing address objects.",
        params: &[ADOM_REQUIRED, NAME, MEMBERS, COMMENT],
    },
    ToolSpec {
        name: "update_address_group",
        description: "Update fields of an address group (e.g. its member list).",
        params: &[ADOM_REQUIRED, NAME, DATA],
    },
    ToolSpec {
        name: "delete_address_group",
        description: "Delete an address group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "list_services",
        description: "List custom service objects in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS, FILTER],
    },
    ToolSpec {
        name: "get_service",
        description: "Get one custom service object.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_service_tcp_udp",
        description: "Create a TCP/UDP/SCTP service object.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "tcp_ports",
                kind: ParamKind::String,
                description: "TCP port or range, e.g. \"443\" or \"8000-8080\"",
                required: false,
            },
            ParamSpec {
                name: "udp_ports",
                kind: ParamKind::String,
                description: "UDP port or range",
                required: false,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "create_service_icmp",
        description: "Create an ICMP service object.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "icmp_type",
                kind: ParamKind::Integer,
                description: "ICMP type, e.g. 8 for echo request",
                required: true,
            },
            ParamSpec {
                name: "icmp_code",
                kind: ParamKind::Integer,
                description: "ICMP code (default: 0)",
                required: false,
            },
            COMMENT,
        ],
    },
    ToolSpec {
        name: "update_service",
        description: "Update fields of a service object.",
        params: &[ADOM_REQUIRED, NAME, DATA],
    },
    ToolSpec {
        name: "delete_service",
        description: "Delete a service object.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "list_service_groups",
        description: "List service groups in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS, FILTER],
    },
    ToolSpec {
        name: "get_service_group",
        description: "Get one service group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_service_group",
        description: "Create a service group from existing service objects.",
        params: &[ADOM_REQUIRED, NAME, MEMBERS, COMMENT],
    },
    ToolSpec {
        name: "delete_service_group",
        description: "Delete a service group.",
        params: &[ADOM_REQUIRED, NAME],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_addresses" => list_kind(client, args, ADDRESS, "addresses").await,
        "get_address" => get_kind(client, args, ADDRESS, "address").await,
        "create_address_subnet" => create_address_subnet(client, args).await,
        "create_address_host" => create_address_host(client, args).await,
        "create_address_fqdn" => create_address_fqdn(client, args).await,
        "create_address_range" => create_address_range(client, args).await,
        "update_address" => update_kind(client, args, ADDRESS, "address").await,
        "delete_address" => delete_kind(client, args, ADDRESS, "address").await,
        "list_address_groups" => list_kind(client, args, ADDRGRP, "groups").await,
        "get_address_group" => get_kind(client, args, ADDRGRP, "group").await,
        "create_address_group" => create_group(client, args, ADDRGRP, "address group").await,
        "update_address_group" => update_kind(client, args, ADDRGRP, "group").await,
        "delete_address_group" => delete_kind(client, args, ADDRGRP, "address group").await,
        "list_services" => list_kind(client, args, SERVICE, "services").await,
        "get_service" => get_kind(client, args, SERVICE, "service").await,
        "create_service_tcp_udp" => create_service_tcp_udp(client, args).await,
        "create_service_icmp" => create_service_icmp(client, args).await,
        "update_service" => update_kind(client, args, SERVICE, "service").await,
        "delete_service" => delete_kind(client, args, SERVICE, "service").await,
        "list_service_groups" => list_kind(client, args, SERVICE_GROUP, "groups").await,
        "get_service_group" => get_kind(client, args, SERVICE_GROUP, "group").await,
        "create_service_group" => create_group(client, args, SERVICE_GROUP, "service group").await,
        "delete_service_group" => delete_kind(client, args, SERVICE_GROUP, "service group").await,
        _ => return None,
    })
}

async fn list_kind(
    client: &FmgClient,
    args: &Map<String, Value>,
    kind: &str,
    key: &str,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let filter = optional_filter(args, "filter");
    let objects = client.list_objects(&adom, kind, fields, filter).await?;
    Ok(success_list(key, objects))
}

async fn get_kind(
    client: &FmgClient,
    args: &Map<String, Value>,
    kind: &str,
    key: &str,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let object = client.get_object(&adom, kind, &name).await?;
    Ok(success_with(key, object))
}

async fn update_kind(
    client: &FmgClient,
    args: &Map<String, Value>,
    kind: &str,
    what: &str,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let data = require_object_map(args, "data")?;
    client.update_object(&adom, kind, &name, data).await?;
    Ok(success_message(format!("{what} {name} updated")))
}

async fn delete_kind(
    client: &FmgClient,
    args: &Map<String, Value>,
    kind: &str,
    what: &str,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    client.delete_object(&adom, kind, &name).await?;
    Ok(success_message(format!("{what} {name} deleted")))
}

fn with_comment(mut data: Map<String, Value>, args: &Map<String, Value>) -> Value {
    if let Some(comment) = optional_str(args, "comment") {
        data.insert("comment".to_string(), json!(comment));
    }
    Value::Object(data)
}

async fn create_address_subnet(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let subnet = validate_ipv4_cidr(require_str(args, "subnet")?)?;

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("type".to_string(), json!("ipmask"));
    data.insert("subnet".to_string(), json!(subnet));

    client.create_object(&adom, ADDRESS, with_comment(data, args)).await?;
    Ok(success_message(format!("address {name} created")))
}

async fn create_address_host(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let ip = validate_ipv4(require_str(args, "ip")?)?;

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("type".to_string(), json!("ipmask"));
    data.insert("subnet".to_string(), json!(format!("{ip}/32")));

    client.create_object(&adom, ADDRESS, with_comment(data, args)).await?;
    Ok(success_message(format!("address {name} created")))
}

async fn create_address_fqdn(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let fqdn = validate_fqdn(require_str(args, "fqdn")?)?;

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("type".to_string(), json!("fqdn"));
    data.insert("fqdn".to_string(), json!(fqdn));

    client.create_object(&adom, ADDRESS, with_comment(data, args)).await?;
    Ok(success_message(format!("address {name} created")))
}

async fn create_address_range(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let start_ip = validate_ipv4(require_str(args, "start_ip")?)?;
    let end_ip = validate_ipv4(require_str(args, "end_ip")?)?;

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("type".to_string(), json!("iprange"));
    data.insert("start-ip".to_string(), json!(start_ip));
    data.insert("end-ip".to_string(), json!(end_ip));

    client.create_object(&adom, ADDRESS, with_comment(data, args)).await?;
    Ok(success_message(format!("address {name} created")))
}

async fn create_group(
    client: &FmgClient,
    args: &Map<String, Value>,
    kind: &str,
    what: &str,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let members = optional_string_vec(args, "members")?.ok_or_else(|| {
        FmgError::Validation("missing required parameter 'members'".to_string())
    })?;
    if members.is_empty() {
        return Err(FmgError::Validation("'members' cannot be empty".to_string()));
    }

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("member".to_string(), json!(members));

    client.create_object(&adom, kind, with_comment(data, args)).await?;
    Ok(success_message(format!("{what} {name} created")))
}

async fn create_service_tcp_udp(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let tcp_ports = optional_str(args, "tcp_ports");
    let udp_ports = optional_str(args, "udp_ports");
    if tcp_ports.is_none() && udp_ports.is_none() {
        return Err(FmgError::Validation(
            "at least one of 'tcp_ports' or 'udp_ports' is required".to_string(),
        ));
    }

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("protocol".to_string(), json!("TCP/UDP/SCTP"));
    if let Some(tcp) = tcp_ports {
        data.insert("tcp-portrange".to_string(), json!(validate_port_range(tcp)?));
    }
    if let Some(udp) = udp_ports {
        data.insert("udp-portrange".to_string(), json!(validate_port_range(udp)?));
    }

    client.create_object(&adom, SERVICE, with_comment(data, args)).await?;
    Ok(success_message(format!("service {name} created")))
}

async fn create_service_icmp(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let icmp_type = super::require_i64(args, "icmp_type")?;
    let icmp_code = super::optional_i64(args, "icmp_code").unwrap_or(0);

    let mut data = Map::new();
    data.insert("name".to_string(), json!(name));
    data.insert("protocol".to_string(), json!("ICMP"));
    data.insert("icmptype".to_string(), json!(icmp_type));
    data.insert("icmpcode".to_string(), json!(icmp_code));

    client.create_object(&adom, SERVICE, with_comment(data, args)).await?;
    Ok(success_message(format!("service {name} created")))
}
