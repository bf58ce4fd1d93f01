/*
 * Copyright (c) 2022 McSib
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Template used for asset transfers.
const TRANSFER_TEMPLATE: &str = "{msg:40} {bytes:>10}/{total_bytes:<10} [{bar:30}] {binary_bytes_per_sec}";

/// Template used when the server didn't announce a size.
const UNSIZED_TEMPLATE: &str = "{msg:40} {spinner} {bytes:>10} {binary_bytes_per_sec}";

/// Width of the title column in the transfer bar.
const TITLE_WIDTH: usize = 40;

/// A builder that helps in making a new [ProgressStyle] for use.
pub(crate) struct ProgressStyleBuilder {
    progress_style: ProgressStyle,
}

impl ProgressStyleBuilder {
    /// Sets the template of the progress style, keeping the default bar if the template is rejected.
    pub(crate) fn template(mut self, msg_template: &str) -> Self {
        match self.progress_style.clone().template(msg_template) {
            Ok(style) => self.progress_style = style,
            Err(err) => warn!("Template error with '{}': {}. Using default bar.", msg_template, err),
        }
        self
    }

    pub(crate) fn progress_chars(mut self, chars: &str) -> Self {
        self.progress_style = self.progress_style.progress_chars(chars);
        self
    }

    pub(crate) fn build(self) -> ProgressStyle {
        self.progress_style
    }
}

impl Default for ProgressStyleBuilder {
    fn default() -> Self {
        Self {
            progress_style: ProgressStyle::default_bar(),
        }
    }
}

/// A builder that helps in initializing and configuring a new [ProgressBar] for use.
pub(crate) struct ProgressBarBuilder {
    progress_bar: ProgressBar,
}

impl ProgressBarBuilder {
    /// Creates a bar of known length, or a spinner when the length is unknown.
    pub(crate) fn new(len: Option<u64>) -> Self {
        Self {
            progress_bar: match len {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::no_length(),
            },
        }
    }

    pub(crate) fn style(self, progress_style: ProgressStyle) -> Self {
        self.progress_bar.set_style(progress_style);
        self
    }

    pub(crate) fn draw_target(self, target: ProgressDrawTarget) -> Self {
        self.progress_bar.set_draw_target(target);
        self
    }

    pub(crate) fn message(self, message: String) -> Self {
        self.progress_bar.set_message(message);
        self
    }

    pub(crate) fn build(self) -> ProgressBar {
        self.progress_bar
    }
}

/// Pads or cuts a title to exactly [`TITLE_WIDTH`] characters.
pub(crate) fn fit_title(title: &str) -> String {
    let mut fitted: String = title.chars().take(TITLE_WIDTH).collect();
    let width = fitted.chars().count();
    fitted.extend(std::iter::repeat_n(' ', TITLE_WIDTH - width));
    fitted
}

/// Creates the bar shown while an asset streams to disk.
pub(crate) fn transfer_bar(title: &str, len: Option<u64>, visible: bool) -> ProgressBar {
    let template = if len.is_some() { TRANSFER_TEMPLATE } else { UNSIZED_TEMPLATE };
    let target = if visible { ProgressDrawTarget::stderr_with_hz(5) } else { ProgressDrawTarget::hidden() };
    ProgressBarBuilder::new(len)
        .style(ProgressStyleBuilder::default().template(template).progress_chars("=>-").build())
        .draw_target(target)
        .message(fit_title(title))
        .build()
}
