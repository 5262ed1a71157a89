//! Record normalization: raw fields + addresses → [`TenderRecord`].

use chrono::NaiveDateTime;
use tenderscan_shared::{Flag, RawField, RawFieldMap, TenderNumber, TenderRecord};

use crate::address::AddressSet;

/// Format of the `CrawlingDateTime` column.
pub const CRAWL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Constant columns supplied by configuration.
#[derive(Debug, Clone)]
pub struct RecordDefaults {
    /// `TenderType` column value.
    pub tender_type: String,
    /// `NameOfWebSite` column value.
    pub website: String,
}

/// Everything needed to build one record.
#[derive(Debug, Clone)]
pub struct NormalizeInput<'a> {
    pub tender_number: TenderNumber,
    pub fields: &'a RawFieldMap,
    pub addresses: &'a AddressSet,
    /// Converted document content, `None` when conversion failed.
    pub html_content: Option<String>,
    pub crawled_at: NaiveDateTime,
}

/// Ministry and department joined with ", ", skipping empty members.
pub fn contact_address(fields: &RawFieldMap) -> String {
    [RawField::Ministry, RawField::DepartmentName]
        .into_iter()
        .map(|f| fields.text(f))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First non-empty of organisation, department, ministry.
pub fn organization_name(fields: &RawFieldMap) -> String {
    [
        RawField::OrganisationName,
        RawField::DepartmentName,
        RawField::Ministry,
    ]
    .into_iter()
    .map(|f| fields.text(f))
    .find(|v| !v.is_empty())
    .unwrap_or("")
    .to_string()
}

pub fn requirement_work_brief(fields: &RawFieldMap) -> String {
    format!(
        "supply of {} - {} | Quantity | {} - MSME Exemption | {} - Startup Exemption | {}",
        fields.text(RawField::BoqTitle),
        fields.text(RawField::ItemCategory),
        fields.text(RawField::TotalQuantity),
        fields.text(RawField::MsmeExemption),
        fields.text(RawField::StartupExemption),
    )
}

pub fn work_description(fields: &RawFieldMap) -> String {
    format!(
        "{} - {}",
        fields.text(RawField::BoqTitle),
        fields.text(RawField::ItemCategory)
    )
}

/// Build the record for one document. Never fails: absent fields become
/// empty strings and flags default to `N`.
pub fn build_record(input: NormalizeInput<'_>, defaults: &RecordDefaults) -> TenderRecord {
    let fields = input.fields;
    let opening_date = fields.text(RawField::BidOpeningDate).to_string();

    TenderRecord {
        tender_number: input.tender_number,
        tender_end_submission_date_time: opening_date.clone(),
        contact_number: fields.text(RawField::TotalQuantity).to_string(),
        tender_type: defaults.tender_type.clone(),
        tender_opening_date_time: opening_date,
        contact_address: contact_address(fields),
        name_of_web_site: defaults.website.clone(),
        crawling_date_time: input.crawled_at.format(CRAWL_TIME_FORMAT).to_string(),
        earnest_money_deposite: fields.text(RawField::EmdAmount).to_string(),
        tender_estimated_cost: fields.text(RawField::EstimatedBidValue).to_string(),
        address: input.addresses.join(),
        requirement_work_brief: requirement_work_brief(fields),
        tender_prod_no: Flag::from_answer(fields.get(RawField::MsmeExemption)),
        contact_phone2: Flag::from_answer(fields.get(RawField::StartupExemption)),
        tender_detail_work_description: work_description(fields),
        html_content: input.html_content,
        document: String::new(),
        organization_name: organization_name(fields),
    }
}
