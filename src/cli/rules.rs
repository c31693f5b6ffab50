use crate::cli::output::{
    format_output,
    table::{or_none, Row, Table},
};
use crate::cli::Session;
use crate::color::verdict_style;
use crate::die;
use crate::resolver::Evaluation;
use crate::RulesArgs;

impl From<Vec<Evaluation>> for Table {
    fn from(value: Vec<Evaluation>) -> Self {
        let mut tab = Table::new(vec![
            "PRIORITY",
            "MATCH",
            "PATTERN",
            "PARSER",
            "CHAT_TEMPLATE",
            "VERDICT",
        ]);

        for evaluation in value {
            let rule = evaluation.rule;

            let row = Row::from(vec![
                rule.priority.to_string(),
                rule.match_type.to_string(),
                rule.pattern,
                or_none(rule.parser_type.as_deref()),
                or_none(rule.chat_template.as_deref()),
                evaluation.verdict.to_string(),
            ]);

            let row = match verdict_style(evaluation.verdict) {
                Some(style) => row.styled(style),
                None => row,
            };

            tab.add_row(row);
        }

        tab
    }
}

pub(crate) async fn rules_cmd(session: &Session, args: &RulesArgs) {
    let engine = session.engine(args.engine.as_deref());

    let trace = match session
        .resolver
        .explain_rules(&engine, &args.model, args.rule_type)
        .await
    {
        Ok(Some(trace)) => trace,
        Ok(None) => die!("engine \"{}\" is not in the catalog", engine),
        Err(err) => die!("failed to evaluate parser rules: {}", err),
    };

    format_output(trace, args.format);
}
