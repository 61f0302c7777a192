// =============================================================================
// GROUP / ROLE CONSTANTS
// =============================================================================

/// Identity-provider group granting administrator access
pub const GROUP_ADMIN: &str = "ADMIN";

/// Identity-provider group granting accountant (CPA) access
pub const GROUP_CPA: &str = "CPA";

/// Identity-provider group for regular clients
pub const GROUP_CLIENT: &str = "CLIENT";

/// Claim carrying group memberships in Cognito access and ID tokens
pub const GROUPS_CLAIM: &str = "cognito:groups";

// =============================================================================
// INVOICE CONSTANTS
// =============================================================================

/// Status assigned to every invoice at creation
pub const INVOICE_STATUS_UPLOADED: &str = "UPLOADED";

/// Status assigned once an accountant set amount and type
pub const INVOICE_STATUS_CLASSIFIED: &str = "CLASSIFIED";

/// Success message returned by the upload endpoint
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Invoice uploaded successfully!";

/// Validation message returned when a required upload field is absent
pub const UPLOAD_MISSING_FIELDS_MESSAGE: &str = "Error: Missing userId, fileName or fileContent";

/// Message returned with every unhandled upload failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
