//! Editor affordance catalogue
//!
//! Ranked locators for every control of the login form and the
//! SmartEditor ONE write surface that the publisher touches. When the
//! remote UI changes, this is the only file that should need an update.

use crate::locator::Locator;

/// Frame `src` fragments that indicate the write editor
pub const EDITOR_SRC_HINTS: &[&str] = &["PostWrite", "Redirect=Write", "editor"];

/// Page URL fragments that mean the browser is still on the write page
pub const WRITE_PAGE_HINTS: &[&str] = &["PostWrite", "Redirect=Write"];

/// URL fragment identifying the login surface
pub const LOGIN_SURFACE_HINT: &str = "nidlogin";

pub fn login_id() -> Locator {
    Locator::new("login id field")
        .css("#id")
        .css("input[name='id']")
}

pub fn login_password() -> Locator {
    Locator::new("login password field")
        .css("#pw")
        .css("input[name='pw']")
}

pub fn login_submit() -> Locator {
    Locator::new("login submit")
        .css("#log\\.login")
        .css(".btn_login")
        .css("button[type='submit']")
}

/// The named editor frame
pub fn editor_frame(name: &str) -> Locator {
    Locator::new("editor frame")
        .css(format!("iframe#{}", name))
        .css(format!("iframe[name='{}']", name))
}

pub fn any_frame() -> Locator {
    Locator::new("nested frame").css("iframe")
}

/// DOM signature of the editor itself
pub fn editor_signature() -> Locator {
    Locator::new("editor signature")
        .css(".se-content")
        .css(".se-documentTitle")
}

pub fn title_field() -> Locator {
    Locator::new("title field")
        .css(".se-documentTitle .se-text-paragraph")
        .css(".se-title-text")
}

pub fn body_root() -> Locator {
    Locator::new("body")
        .css(".se-component.se-text .se-text-paragraph")
        .css(".se-content")
}

pub fn font_size_button() -> Locator {
    Locator::new("font size button")
        .css(".se-font-size-code-toolbar-button")
        .css("button[data-name='font-size']")
}

pub fn font_size_option(size: &str) -> Locator {
    Locator::new(format!("font size {}", size))
        .css(format!(".se-toolbar-option-font-size-code-fs{}-button", size))
        .xpath(format!(
            "//button[contains(@class,'se-toolbar-option-font-size')][normalize-space()='{}']",
            size
        ))
}

pub fn quote_tool() -> Locator {
    Locator::new("quote tool")
        .css(".se-insert-quotation-default-toolbar-button")
        .css("button[data-name='quotation']")
}

/// Secondary quote style (vertical line)
pub fn quote_variant() -> Locator {
    Locator::new("quote variant")
        .css(".se-toolbar-option-insert-quotation-quotation_line-button")
        .css("button[data-value='quotation_line']")
}

pub fn image_tool() -> Locator {
    Locator::new("image tool")
        .css(".se-image-toolbar-button")
        .css("button[data-name='image']")
}

pub fn file_input() -> Locator {
    Locator::new("file input").css("input[type='file']")
}

/// Present while an uploaded image is still being processed
pub fn media_in_progress() -> Locator {
    Locator::new("media loading indicator")
        .css(".se-image-loading")
        .css(".se-component-loading")
}

/// Known close/cancel buttons of help panels and restore prompts
pub fn dialog_dismiss() -> Vec<Locator> {
    vec![
        Locator::new("popup cancel").css(".se-popup-button-cancel"),
        Locator::new("help panel close").css(".se-help-panel-close-button"),
        Locator::new("popup close").css(".se-popup-close-button"),
    ]
}

pub fn publish_panel() -> Locator {
    Locator::new("publish panel button")
        .css("button[data-click-area='tpb.publish']")
        .css(".publish_btn__m9KHH")
        .xpath("//button[.//span[normalize-space()='발행']]")
}

pub fn publish_confirm() -> Locator {
    Locator::new("publish confirm")
        .css("button[data-testid='seOnePublishBtn']")
        .css(".confirm_btn__WEaBq")
        .xpath("//div[contains(@class,'layer_btn_area')]//button[contains(@class,'confirm')]")
}

pub fn save_draft() -> Locator {
    Locator::new("save button")
        .css("button[data-click-area='tpb.save']")
        .css(".save_btn__bzc5B")
        .xpath("//button[.//span[normalize-space()='저장']]")
}

pub fn schedule_option() -> Locator {
    Locator::new("scheduled option")
        .css("label[for='radio_time2']")
        .css("#radio_time2")
}

pub fn date_input() -> Locator {
    Locator::new("date input")
        .css("input[class*='input_date']")
        .css(".input_date__QmA0s")
}

/// Calendar day button, restricted to cells of the displayed month
pub fn calendar_day(day: u32) -> Locator {
    Locator::new(format!("calendar day {}", day))
        .xpath(format!(
            "//td[not(contains(@class,'other')) and not(contains(@class,'disabled'))]\
             //button[normalize-space()='{}']",
            day
        ))
        .xpath(format!(
            "//td[not(contains(@class,'ui-datepicker-other-month'))]//a[normalize-space()='{}']",
            day
        ))
}

pub fn hour_option(hour: u32) -> Locator {
    Locator::new(format!("hour {:02}", hour))
        .css(format!("select[class*='hour'] option[value='{:02}']", hour))
        .css(format!("select[class*='hour'] option[value='{}']", hour))
}

pub fn minute_option(minute: u32) -> Locator {
    Locator::new(format!("minute {:02}", minute))
        .css(format!("select[class*='minute'] option[value='{:02}']", minute))
        .css(format!("select[class*='minute'] option[value='{}']", minute))
}
