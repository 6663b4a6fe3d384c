use rmcp::model::CallToolResult;
use tracing::debug;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, invalid,
    json_result,
};
use crate::dates::DateRange;
use crate::models::{
    DetailedFilter, DetailedReportRequest, EntityFilter, SummaryFilter, SummaryReportRequest,
};

const DEFAULT_GROUPS: [&str; 2] = ["PROJECT", "TIMEENTRY"];
const MAX_GROUPS: usize = 3;
const SORT_ORDERS: [&str; 2] = ["ASCENDING", "DESCENDING"];

const START_PARAM: Param =
    Param::string("start", "Report start date (ISO 8601, e.g. 2024-01-01T00:00:00Z)").required();

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_report_summary",
            "Generate a summary report for a workspace",
            vec![
                START_PARAM,
                Param::string("end", "Report end date (ISO 8601)").required(),
                Param::string("project_id", "Filter by project ID"),
                Param::string("user_id", "Filter by user ID"),
                Param::string_array(
                    "groups",
                    "Up to three grouping levels, e.g. PROJECT, USER, TIMEENTRY (default PROJECT, TIMEENTRY)",
                ),
                WORKSPACE_PARAM,
            ],
            handler!(summary),
        ),
        Tool::new(
            "clockify_report_detailed",
            "Generate a detailed report for a workspace",
            vec![
                START_PARAM,
                Param::string("end", "Report end date (ISO 8601)").required(),
                Param::string("project_id", "Filter by project ID"),
                Param::string("user_id", "Filter by user ID"),
                PAGE_PARAM,
                Param::number("page_size", "Page size (default 50)"),
                Param::string("sort_column", "Column to sort by, e.g. DATE"),
                Param::string("sort_order", "ASCENDING or DESCENDING"),
                WORKSPACE_PARAM,
            ],
            handler!(detailed),
        ),
    ]
}

fn range(args: &Arguments) -> Result<DateRange, ToolError> {
    let range = DateRange::from_inputs(&args.require_text("start")?, &args.require_text("end")?)
        .map_err(invalid)?;
    debug!(start = range.start(), end = range.end(), seconds = range.seconds(), "report range");
    Ok(range)
}

fn filters(args: &Arguments) -> Result<(Option<EntityFilter>, Option<EntityFilter>), ToolError> {
    let users = args.text("user_id")?.map(EntityFilter::single);
    let projects = args.text("project_id")?.map(EntityFilter::single);
    Ok((users, projects))
}

fn groups(args: &Arguments) -> Result<Vec<String>, ToolError> {
    let groups: Vec<String> = args
        .text_list("groups")?
        .unwrap_or_default()
        .into_iter()
        .map(|group| group.to_ascii_uppercase())
        .collect();
    if groups.len() > MAX_GROUPS {
        return Err(invalid(format!("groups accepts at most {MAX_GROUPS} entries")));
    }
    if groups.is_empty() {
        return Ok(DEFAULT_GROUPS.iter().map(|group| group.to_string()).collect());
    }
    Ok(groups)
}

async fn summary(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let range = range(args)?;
    let (users, projects) = filters(args)?;
    let request = SummaryReportRequest {
        date_range_start: range.start().to_string(),
        date_range_end: range.end().to_string(),
        summary_filter: Some(SummaryFilter {
            groups: groups(args)?,
        }),
        users,
        projects,
    };
    let report = registry
        .client()
        .summary_report(&workspace_id, &request)
        .await
        .failed_to("get summary report")?;
    json_result(&report)
}

async fn detailed(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let range = range(args)?;
    let (users, projects) = filters(args)?;
    let page = args.page()?;
    let sort_order = args
        .text("sort_order")?
        .map(|order| order.to_ascii_uppercase())
        .map(|order| {
            if SORT_ORDERS.contains(&order.as_str()) {
                Ok(order)
            } else {
                Err(invalid("sort_order must be ASCENDING or DESCENDING"))
            }
        })
        .transpose()?;

    let request = DetailedReportRequest {
        date_range_start: range.start().to_string(),
        date_range_end: range.end().to_string(),
        detailed_filter: Some(DetailedFilter {
            page: page.page,
            page_size: page.page_size,
        }),
        users,
        projects,
        sort_column: args.text("sort_column")?.map(|column| column.to_ascii_uppercase()),
        sort_order,
        page: page.page,
        page_size: page.page_size,
    };
    let report = registry
        .client()
        .detailed_report(&workspace_id, &request)
        .await
        .failed_to("get detailed report")?;
    json_result(&report)
}
