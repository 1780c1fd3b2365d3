//! Built-in layout documents used when no file is installed.
//!
//! Deployments rely on these exact mappings and rectangles; keep them stable.

pub const DEFAULT_LAYERS_JSON: &str = r#"{
    "main_surface": {
        "surface_role": "HomeScreen"
    },
    "mappings": [
        {
            "role": "^HomeScreen$",
            "name": "HomeScreen",
            "layer_id": 1000,
            "area": { "type": "full" }
        },
        {
            "role": "MediaPlayer|Radio|Phone|Navigation|HVAC|Settings|Dashboard|POI|Mixer",
            "name": "apps",
            "layer_id": 1001,
            "area": {
                "type": "rect",
                "rect": { "x": 0, "y": 218, "width": -1, "height": -433 }
            }
        },
        {
            "role": "^OnScreen.*",
            "name": "popups",
            "layer_id": 9999,
            "area": {
                "type": "rect",
                "rect": { "x": 0, "y": 760, "width": -1, "height": 400 }
            }
        }
    ]
}"#;

pub const DEFAULT_AREAS_JSON: &str = r#"{
    "areas": [
        { "name": "fullscreen", "rect": { "x": 0, "y": 0, "w": 1080, "h": 1920 } },
        { "name": "normal.full", "rect": { "x": 0, "y": 218, "w": 1080, "h": 1488 } },
        { "name": "split.main", "rect": { "x": 0, "y": 218, "w": 1080, "h": 744 } },
        { "name": "split.sub", "rect": { "x": 0, "y": 962, "w": 1080, "h": 744 } },
        { "name": "software_keyboard", "rect": { "x": 0, "y": 962, "w": 1080, "h": 744 } },
        { "name": "restriction.normal", "rect": { "x": 0, "y": 218, "w": 1080, "h": 1488 } },
        { "name": "restriction.split.main", "rect": { "x": 0, "y": 218, "w": 1080, "h": 744 } },
        { "name": "restriction.split.sub", "rect": { "x": 0, "y": 962, "w": 1080, "h": 744 } },
        { "name": "on_screen", "rect": { "x": 0, "y": 218, "w": 1080, "h": 1488 } }
    ]
}"#;

pub const DEFAULT_OLD_ROLES_JSON: &str = r#"{
    "old_roles": [
        { "name": "HomeScreen", "new": "homescreen" },
        { "name": "Music", "new": "music" },
        { "name": "MediaPlayer", "new": "music" },
        { "name": "Video", "new": "video" },
        { "name": "VideoPlayer", "new": "video" },
        { "name": "WebBrowser", "new": "browser" },
        { "name": "Radio", "new": "radio" },
        { "name": "Phone", "new": "phone" },
        { "name": "Navigation", "new": "map" },
        { "name": "HVAC", "new": "hvac" },
        { "name": "Settings", "new": "settings" },
        { "name": "Dashboard", "new": "dashboard" },
        { "name": "POI", "new": "poi" },
        { "name": "Mixer", "new": "mixer" },
        { "name": "Restriction", "new": "restriction" },
        { "name": "^OnScreen.*", "new": "on_screen" }
    ]
}"#;
