//! User-facing texts.

pub const WELCOME: &str = "👋 Welcome to the AI Video Creator Bot!\n\n\
    Send me a text prompt describing the image you want to create, \
    and I'll generate a video with animation and music.\n\n\
    Use /help to see available commands.";

pub const HELP: &str = "🤖 AI Video Creator Bot Help\n\n\
    1. Simply send me a text description of the image you want to create\n\
    2. I'll generate an image using AI\n\
    3. Choose background music from the options\n\
    4. I'll create an animated video with your chosen music\n\n\
    Commands:\n\
    /start - Start the bot\n\
    /help - Show this help message";

pub const GENERATING_IMAGE: &str = "🎨 Generating image from your prompt...";

pub const CHOOSE_TRACK: &str = "🎵 Image generated! Now choose background music:";

pub const CREATING_VIDEO: &str = "🎬 Creating your video...";

pub const VIDEO_CAPTION: &str = "✨ Here's your AI-generated video!";

pub const SESSION_EXPIRED: &str = "Session expired. Please start over.";

pub const IMAGE_QUOTA: &str = "The AI image generation service is currently unavailable \
    due to API limits. Please try again later or contact support if this persists.";

pub const IMAGE_AUTH: &str = "There was an authentication error with the image generation \
    service. Please contact support for assistance.";

const IMAGE_FAILURE_TIPS: &str = "You can try:\n\
    1. Using a different prompt\n\
    2. Waiting a few minutes before trying again\n\
    3. Contacting support if the issue persists";

pub const UNEXPECTED: &str = "An unexpected error occurred. Please try again later.";

/// Status text replacing "generating" when no image came back.
pub fn image_failure(reason: &str) -> String {
    format!("❌ {}\n\n{}", reason, IMAGE_FAILURE_TIPS)
}

/// Status text for a failed video request.
pub fn error(detail: &str) -> String {
    format!("❌ Error: {}", detail)
}

/// Standalone message for failures outside the normal flow.
pub fn unexpected_error() -> String {
    format!(
        "{}\n\nPlease try again or contact support if the issue persists.",
        error(UNEXPECTED)
    )
}
