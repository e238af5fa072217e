use serde::Serialize;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
pub enum NodeCategory {
    #[strum(serialize = "Frames")]
    Frames,
    #[strum(serialize = "Text")]
    Text,
    #[strum(serialize = "Audio")]
    Audio,
}

/// Descriptor for one processing operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeDetails {
    pub name:         &'static str,
    pub display_name: &'static str,
    pub category:     NodeCategory,
    pub description:  &'static str,
}

pub static SCENE_DETECT: NodeDetails = NodeDetails {
    name:         "detect-scenes",
    display_name: "Scene Detect",
    category:     NodeCategory::Frames,
    description:  "Split a frame batch into scenes, with remaining frames for chaining",
};

pub static CROP: NodeDetails = NodeDetails {
    name:         "crop",
    display_name: "Crop",
    category:     NodeCategory::Frames,
    description:  "Crop a region from every frame, optionally rounding the size up",
};

pub static STITCH: NodeDetails = NodeDetails {
    name:         "stitch",
    display_name: "Stitch",
    category:     NodeCategory::Frames,
    description:  "Paste cropped frames back onto the originals",
};

pub static SHARPEST: NodeDetails = NodeDetails {
    name:         "sharpest",
    display_name: "Clip to Sharpest Frame",
    category:     NodeCategory::Frames,
    description:  "Keep only the sharpest frame by variance of the Laplacian",
};

pub static SELECT_SHARPEST: NodeDetails = NodeDetails {
    name:         "select-sharpest",
    display_name: "Select Sharpest Frames",
    category:     NodeCategory::Frames,
    description:  "Sample frames at an interval, taking the sharpest in a window",
};

pub static RESOLUTION: NodeDetails = NodeDetails {
    name:         "resolution",
    display_name: "Resolution Calculator",
    category:     NodeCategory::Frames,
    description:  "Largest 16-aligned frame size for a VRAM budget and frame count",
};

pub static LOAD_TEXT: NodeDetails = NodeDetails {
    name:         "load-text",
    display_name: "Load Text File",
    category:     NodeCategory::Text,
    description:  "Load a .txt file from a directory by index",
};

pub static LINE_COUNT: NodeDetails = NodeDetails {
    name:         "line-count",
    display_name: "Text Line Count",
    category:     NodeCategory::Text,
    description:  "Count the lines of a text",
};

pub static TRIGGER_WORD: NodeDetails = NodeDetails {
    name:         "trigger-word",
    display_name: "LoRA Trigger Word",
    category:     NodeCategory::Text,
    description:  "Trigger word from an adapter file name, the part before `_lora`",
};

pub static SAVE_AUDIO: NodeDetails = NodeDetails {
    name:         "save-audio",
    display_name: "Save Audio (Advanced)",
    category:     NodeCategory::Audio,
    description:  "Write audio as WAV with a chosen sample encoding",
};

#[inline]
pub fn all_nodes() -> [NodeDetails; 10] {
    [
        SCENE_DETECT,
        CROP,
        STITCH,
        SHARPEST,
        SELECT_SHARPEST,
        RESOLUTION,
        LOAD_TEXT,
        LINE_COUNT,
        TRIGGER_WORD,
        SAVE_AUDIO,
    ]
}
