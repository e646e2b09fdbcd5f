//! Built-in knowledge base used when no external source yields usable rows.

use crate::types::{KnowledgeBase, KnowledgeEntry};

struct Seed {
    key: &'static str,
    problem: &'static str,
    keywords: &'static [&'static str],
    solutions: &'static [&'static str],
    category: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        key: "login_issues",
        problem: "Cannot login to account",
        keywords: &["login", "signin", "password", "account", "credentials", "authentication"],
        solutions: &[
            "Reset your password using the 'Forgot Password' link",
            "Check if your email address is correct",
            "Clear your browser cache and cookies",
            "Try logging in from an incognito/private window",
            "Ensure your account is not locked or suspended",
            "Contact support if the issue persists",
        ],
        category: "Account Issues",
    },
    Seed {
        key: "phone_screen_issues",
        problem: "Phone screen problems (cracked, unresponsive, touch not working)",
        keywords: &["phone", "mobile", "screen", "display", "touch", "digitizer", "glass", "crack", "unresponsive"],
        solutions: &[
            "Restart the phone and try again",
            "Remove any screen protector and test touch response",
            "Check for software updates and install the latest version",
            "Boot into safe mode to rule out third-party apps",
            "Run touchscreen calibration (if supported)",
            "If physically cracked, visit an authorized service center for replacement",
        ],
        category: "Phone - Screen",
    },
    Seed {
        key: "phone_charging_issues",
        problem: "Phone not charging or charging slowly",
        keywords: &["phone", "mobile", "charge", "charging", "charger", "cable", "battery", "port"],
        solutions: &[
            "Try a different power adapter and USB cable",
            "Clean the charging port gently with a soft brush",
            "Check for debris or moisture in the port",
            "Disable optimized charging/enable normal charging mode",
            "Update to the latest OS version",
            "If still not charging, contact service for port/battery diagnostics",
        ],
        category: "Phone - Charging",
    },
    Seed {
        key: "phone_network_issues",
        problem: "Phone network or connectivity problems",
        keywords: &[
            "phone", "mobile", "network", "signal", "sim", "4g", "5g", "lte", "no service", "wifi", "bluetooth",
            "hotspot",
        ],
        solutions: &[
            "Toggle Airplane mode OFF/ON and re-check",
            "Remove and reinsert the SIM card",
            "Reset network settings from Settings > System > Reset",
            "Forget and reconnect to Wi-Fi; try a different network",
            "Update carrier settings/OS to latest version",
            "Contact your carrier if there is a local outage",
        ],
        category: "Phone - Connectivity",
    },
    Seed {
        key: "phone_storage_issues",
        problem: "Phone storage full or running out of space",
        keywords: &["phone", "mobile", "storage", "space", "memory full", "cleanup", "delete"],
        solutions: &[
            "Delete unused apps and large media files",
            "Clear app caches (Photos, social, browsers)",
            "Enable automatic photo backup and remove local copies",
            "Move files to cloud or SD card (if supported)",
            "Review Downloads and Screen Recordings folders",
            "Restart the phone after cleanup to reclaim space",
        ],
        category: "Phone - Storage",
    },
    Seed {
        key: "phone_overheating",
        problem: "Phone overheating",
        keywords: &["phone", "mobile", "hot", "overheat", "temperature", "warm"],
        solutions: &[
            "Remove the case and let the device cool down",
            "Close background apps and reduce screen brightness",
            "Avoid gaming or heavy apps while charging",
            "Update apps and OS to latest versions",
            "Disable high-usage features temporarily (hotspot, GPS)",
            "If overheating persists, contact service for diagnostics",
        ],
        category: "Phone - Thermal",
    },
    Seed {
        key: "phone_camera_issues",
        problem: "Phone camera blurry or not working",
        keywords: &["phone", "mobile", "camera", "photo", "video", "blurry", "focus", "flash"],
        solutions: &[
            "Clean camera lens and remove any case blocking it",
            "Tap to focus and hold steady; disable macro if too close",
            "Clear Camera app cache and restart the app",
            "Test in safe mode to exclude third-party camera apps",
            "Update OS and Camera app",
            "If hardware damage suspected, visit service center",
        ],
        category: "Phone - Camera",
    },
    Seed {
        key: "phone_audio_issues",
        problem: "No sound or distorted audio",
        keywords: &["phone", "mobile", "audio", "sound", "speaker", "volume", "mute"],
        solutions: &[
            "Increase media/call volume and disable Do Not Disturb",
            "Clean the speaker grills; remove debris or case obstructions",
            "Toggle Bluetooth off to avoid routing audio to another device",
            "Restart phone and test with different apps",
            "Update OS and media apps",
            "If still distorted/no output, seek hardware diagnostics",
        ],
        category: "Phone - Audio",
    },
    Seed {
        key: "phone_mic_issues",
        problem: "Microphone not working during calls or recordings",
        keywords: &["phone", "mobile", "microphone", "mic", "record", "call", "voice"],
        solutions: &[
            "Remove case/screen protectors blocking the mic openings",
            "Test mic in Voice Recorder and in calls",
            "Disable noise suppression enhancements if available",
            "Check app permissions for microphone access",
            "Restart device and update OS",
            "If no input detected, contact service",
        ],
        category: "Phone - Microphone",
    },
    Seed {
        key: "phone_call_quality",
        problem: "Poor call quality or dropped calls",
        keywords: &["phone", "mobile", "call", "quality", "dropped", "voice", "volte"],
        solutions: &[
            "Toggle VoLTE/Wi-Fi calling and retest",
            "Move to an area with better signal or switch network band",
            "Reset network settings",
            "Update carrier settings/OS",
            "Try a different SIM or contact carrier to check local outages",
        ],
        category: "Phone - Calls",
    },
    Seed {
        key: "phone_sms_mms",
        problem: "SMS/MMS not sending or receiving",
        keywords: &["phone", "mobile", "sms", "mms", "message", "text", "imessage"],
        solutions: &[
            "Ensure mobile data is on for MMS and correct APN settings",
            "Clear Messages app cache and restart phone",
            "Turn iMessage/RCS off and on (where applicable)",
            "Check recipient number format and block lists",
            "Contact carrier to confirm messaging service status",
        ],
        category: "Phone - Messaging",
    },
    Seed {
        key: "phone_gps_issues",
        problem: "GPS inaccurate or not locking location",
        keywords: &["phone", "mobile", "gps", "location", "maps", "navigation"],
        solutions: &[
            "Enable High Accuracy/Precise Location settings",
            "Calibrate compass; avoid cases that interfere with sensors",
            "Clear Maps app cache and offline data",
            "Update OS and Google Play Services/Apple Maps components",
            "Test outdoors with clear view of sky",
        ],
        category: "Phone - GPS",
    },
    Seed {
        key: "phone_bluetooth_pairing",
        problem: "Bluetooth won't pair or drops connection",
        keywords: &["phone", "mobile", "bluetooth", "pair", "audio", "headphones", "car"],
        solutions: &[
            "Forget device and re-pair; keep device in pairing mode",
            "Toggle Bluetooth OFF/ON and restart the phone",
            "Update firmware of the accessory if available",
            "Keep devices within 1-2 meters and remove other BT pairings",
            "Reset network settings if persistent",
        ],
        category: "Phone - Bluetooth",
    },
    Seed {
        key: "phone_notifications",
        problem: "Notifications not arriving",
        keywords: &["phone", "mobile", "notification", "alerts", "push", "dnd", "battery optimization"],
        solutions: &[
            "Disable Do Not Disturb and Focus modes",
            "Allow app notifications and set them to 'Immediate'",
            "Exclude the app from battery optimization/background limits",
            "Check network connectivity and app-specific notification settings",
            "Update the app and OS",
        ],
        category: "Phone - Notifications",
    },
    Seed {
        key: "phone_hotspot_tether",
        problem: "Hotspot/tethering not working",
        keywords: &["phone", "mobile", "hotspot", "tether", "share", "wifi", "usb"],
        solutions: &[
            "Confirm hotspot plan/carrier support and enable hotspot",
            "Change hotspot band (2.4 GHz/5 GHz) and password",
            "Try USB tethering or Bluetooth tethering as a test",
            "Turn off VPN and reset network settings",
        ],
        category: "Phone - Hotspot",
    },
    Seed {
        key: "phone_update_fail",
        problem: "OS update download/install fails",
        keywords: &["phone", "mobile", "update", "upgrade", "install", "download", "error"],
        solutions: &[
            "Free up storage space (at least 5-10 GB recommended)",
            "Charge to 50%+ and connect to reliable Wi-Fi",
            "Clear updater cache (Android) or use iTunes/Finder (iOS)",
            "Retry after reboot; if persistent, factory reset after backup",
        ],
        category: "Phone - Updates",
    },
    Seed {
        key: "phone_sdcard_storage",
        problem: "SD card not detected or read-only",
        keywords: &["phone", "mobile", "sd", "micro sd", "storage", "card"],
        solutions: &[
            "Re-seat the SD card and clean contacts",
            "Test the card in a PC; back up and reformat to exFAT/FAT32",
            "Use a branded high-speed card; avoid counterfeit cards",
            "If slot still fails, seek hardware service",
        ],
        category: "Phone - SD Card",
    },
    Seed {
        key: "phone_biometric",
        problem: "Face ID/Touch ID not working",
        keywords: &["phone", "mobile", "face id", "touch id", "fingerprint", "biometric"],
        solutions: &[
            "Clean sensors and ensure nothing blocks the camera/home button",
            "Re-register fingerprints/face in a well-lit environment",
            "Remove screen protectors that interfere",
            "Update OS and disable glove mode if enabled",
            "If sensor errors persist, contact service",
        ],
        category: "Phone - Biometric",
    },
    Seed {
        key: "phone_water_damage",
        problem: "Suspected water damage",
        keywords: &["phone", "mobile", "water", "liquid", "moisture", "wet"],
        solutions: &[
            "Power off immediately and do not charge",
            "Dry externally; avoid heat sources, do not shake",
            "Leave in a dry, ventilated place for 24-48 hours",
            "Seek professional inspection; liquid damage may not be covered",
        ],
        category: "Phone - Liquid Damage",
    },
    Seed {
        key: "battery_issues",
        problem: "iPhone battery drains quickly",
        keywords: &["phone", "mobile", "battery", "charge", "power", "drain", "charging", "life"],
        solutions: &[
            "Reduce screen brightness",
            "Turn off Background App Refresh",
            "Enable Low Power Mode",
            "Check Battery Health in Settings",
            "Update iOS to the latest version",
            "If issue persists, consider battery replacement",
        ],
        category: "Battery Issues",
    },
    Seed {
        key: "payment_issues",
        problem: "Payment processing problems",
        keywords: &["payment", "billing", "charge", "refund", "transaction", "card", "money"],
        solutions: &[
            "Check your payment method details",
            "Verify billing address matches your card",
            "Try a different payment method",
            "Contact your bank if card is declined",
            "Clear browser cache and try again",
            "Check if your account has sufficient funds",
        ],
        category: "Payment Issues",
    },
    Seed {
        key: "performance_issues",
        problem: "App running slowly",
        keywords: &["phone", "mobile", "slow", "performance", "timeout", "lag", "speed", "loading"],
        solutions: &[
            "Close unnecessary apps running in background",
            "Restart the application",
            "Check your internet connection",
            "Update to the latest version",
            "Clear app cache if possible",
            "Restart your device",
        ],
        category: "Performance Issues",
    },
    Seed {
        key: "api_integration",
        problem: "API integration help needed",
        keywords: &["api", "integrate", "help", "support", "technical", "documentation"],
        solutions: &[
            "Check our API documentation",
            "Verify your API key is correct",
            "Ensure you're using the correct endpoints",
            "Check rate limits and quotas",
            "Review error messages for specific issues",
            "Contact our technical support team",
        ],
        category: "Technical Support",
    },
    Seed {
        key: "bug_reports",
        problem: "Application bugs or errors",
        keywords: &["bug", "error", "broken", "crash", "issue", "not working"],
        solutions: &[
            "Try refreshing the page or restarting the app",
            "Clear browser cache and cookies",
            "Update to the latest version",
            "Check if the issue occurs on different devices",
            "Report the bug with detailed steps to reproduce",
            "Contact support with error messages",
        ],
        category: "Bug Reports",
    },
    Seed {
        key: "security_concerns",
        problem: "Security issues or concerns",
        keywords: &["security", "hack", "breach", "suspicious", "unauthorized", "threat"],
        solutions: &[
            "Change your password immediately",
            "Enable two-factor authentication",
            "Check your account for unauthorized activity",
            "Contact our security team immediately",
            "Review your account settings",
            "Report any suspicious activity",
        ],
        category: "Security Issues",
    },
];

/// The built-in knowledge base. Never empty.
pub fn default_knowledge_base() -> KnowledgeBase {
    let mut kb = KnowledgeBase::new();
    for seed in SEEDS {
        let entry = KnowledgeEntry {
            problem: seed.problem.to_string(),
            keywords: seed.keywords.iter().map(|k| (*k).to_string()).collect(),
            solutions: seed.solutions.iter().map(|s| (*s).to_string()).collect(),
            category: seed.category.to_string(),
        };
        // seed keys are non-blank literals
        let _ = kb.insert(seed.key, entry);
    }
    kb
}
