use std::collections::BTreeSet;
use std::rc::Rc;

use crate::query::{ScriptApi, is_deferred};
use crate::ui::style;

use super::{Element, Widget, WidgetEnv, WidgetError, WidgetKind};

/// The two inline query forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Prefixed with `inlineQueryPrefix`, evaluated by the query engine
    Expression,
    /// Prefixed with `inlineJsQueryPrefix`, run by the script host
    Script,
}

/// Build the widget for an inline query.
///
/// `source` is the inline code text including its prefix; `code` is the
/// trimmed text after the prefix. Failures never escape: the widget shows
/// the [`WidgetError`] text instead.
pub fn build_query_widget(
    kind: QueryKind,
    source: &str,
    code: &str,
    classes: BTreeSet<String>,
    env: &WidgetEnv<'_>,
) -> Widget {
    let widget = Widget::new(WidgetKind::Query(kind), source, classes, Element::new("span"));
    let outcome = match kind {
        QueryKind::Expression => render_expression(code, &widget, env),
        QueryKind::Script => render_script(code, &widget, env),
    };
    if let Err(err) = outcome {
        tracing::debug!(%err, "inline query not rendered");
        show_error(widget.element(), &err);
    }
    widget
}

fn show_error(element: &Element, err: &WidgetError) {
    element.add_class(style::INLINE_ERROR);
    element.set_text(&err.to_string());
}

fn render_expression(code: &str, widget: &Widget, env: &WidgetEnv<'_>) -> Result<(), WidgetError> {
    if !env.settings.enable_inline_dataview {
        return Err(WidgetError::Disabled);
    }
    let expr = env.engine.parse(code).map_err(|source| WidgetError::Parse {
        code: code.to_string(),
        source,
    })?;
    let value = env
        .engine
        .execute(&expr, env.file_path, env.index.as_ref(), env.settings)
        .map_err(|source| WidgetError::Evaluation {
            code: code.to_string(),
            source,
        })?;
    env.renderer.render_value(
        &value,
        widget.element(),
        env.file_path,
        widget.lifecycle(),
        env.settings,
    );
    Ok(())
}

fn render_script(code: &str, widget: &Widget, env: &WidgetEnv<'_>) -> Result<(), WidgetError> {
    if !env.settings.enable_inline_dataview_js {
        return Err(WidgetError::Disabled);
    }
    let api = ScriptApi::new(env.file_path, Rc::clone(env.index), env.settings.clone());

    if !is_deferred(code) {
        let value = env
            .scripts
            .execute(code, &api)
            .map_err(|source| WidgetError::Script {
                code: code.to_string(),
                source,
            })?;
        env.renderer.render_value(
            &value,
            widget.element(),
            env.file_path,
            widget.lifecycle(),
            env.settings,
        );
        return Ok(());
    }

    // The widget goes in empty and is filled once the script settles.
    let pending = env.scripts.execute_deferred(code, &api);
    let element = widget.element().clone();
    let lifecycle = widget.lifecycle().clone();
    let renderer = Rc::clone(env.renderer);
    let settings = env.settings.clone();
    let file_path = env.file_path.to_path_buf();
    let code = code.to_string();
    env.spawner.spawn(
        widget.lifecycle(),
        Box::pin(async move {
            let result = pending.await;
            if !lifecycle.is_alive() {
                return;
            }
            match result {
                Ok(value) => {
                    renderer.render_value(&value, &element, &file_path, &lifecycle, &settings);
                }
                Err(source) => show_error(&element, &WidgetError::Script { code, source }),
            }
        }),
    );
    Ok(())
}
