/// Name and description of an exported signal.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub metric: &'static str,
    pub help: &'static str,
}

pub const VEHICLE_SPEED: Tag = Tag {
    metric: "joydash_vehicle_speed",
    help: "Current vehicle speed (0-100)",
};

pub const VEHICLE_FUEL: Tag = Tag {
    metric: "joydash_vehicle_fuel_percent",
    help: "Remaining fuel in percent",
};

pub const VEHICLE_TEMP_C: Tag = Tag {
    metric: "joydash_vehicle_temperature_celsius",
    help: "Derived engine temperature in Celsius",
};

pub const FRAMES_APPLIED: Tag = Tag {
    metric: "joydash_frames_applied_total",
    help: "Axis frames applied to the vehicle model",
};

pub const FRAMES_REJECTED: Tag = Tag {
    metric: "joydash_frames_rejected_total",
    help: "Malformed axis frames discarded",
};

pub const LINES_IGNORED: Tag = Tag {
    metric: "joydash_lines_ignored_total",
    help: "Inbound lines that were not axis frames",
};

pub const REPLIES_SENT: Tag = Tag {
    metric: "joydash_replies_sent_total",
    help: "Dashboard lines written back to the controller",
};

pub const UPDATE_INTERVAL_S: Tag = Tag {
    metric: "joydash_update_interval_seconds",
    help: "Time between consecutive vehicle updates",
};
